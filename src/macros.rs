#[macro_export]
macro_rules! amount {
    ($num:literal) => {
        $crate::amount::Amount::new(::rust_decimal::dec!($num))
    };
}

#[macro_export]
macro_rules! date {
    ($y:literal, $m:literal, $d:literal) => {
        ::chrono::NaiveDate::from_ymd_opt($y, $m, $d).unwrap()
    };
}

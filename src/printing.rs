use std::io::{self, Write};

use comfy_table::{Attribute, Cell, CellAlignment, Color, Table, presets};
use serde::Serialize;

use crate::amount::Amount;
pub use accounts::print as accounts;
pub use bars::print as bars;

/// Output format of the report
pub enum Fmt {
    Tty,
    Json,
    Lisp,
}

mod bars {
    use super::*;
    use crate::chart::BarSeries;

    #[derive(Serialize)]
    struct Bars<'a> {
        income: &'a [BarSeries],
        expense: &'a [BarSeries],
    }

    pub fn print(
        mut out: impl Write,
        income: &[BarSeries],
        expense: &[BarSeries],
        empty: bool,
        fmt: Fmt,
    ) -> io::Result<()> {
        match fmt {
            Fmt::Tty => print_tty(out, income, expense, empty),
            Fmt::Json => writeln!(out, "{}", to_json(&Bars { income, expense })?),
            Fmt::Lisp => writeln!(out, "{}", to_lisp(&Bars { income, expense })?),
        }
    }

    fn print_tty(
        out: impl Write,
        income: &[BarSeries],
        expense: &[BarSeries],
        empty: bool,
    ) -> io::Result<()> {
        let mut table = Table::new();
        table.load_preset(presets::NOTHING).set_header(
            ["Date", "Transaction", "Category", "Amount", "Stacked"].map(|s| {
                Cell::new(s)
                    .add_attribute(Attribute::Bold)
                    .set_alignment(CellAlignment::Center)
            }),
        );

        let days = income
            .first()
            .or(expense.first())
            .map_or(0, |s| s.stack.len());

        // income above the axis, expenses below
        let sides = [(income, Amount::from(1)), (expense, Amount::from(-1))];

        for day in 0..days {
            for (series, sign) in sides {
                for s in series {
                    let Some(p) = s.stack.get(day) else {
                        continue;
                    };
                    if p.height().is_zero() && !empty {
                        continue;
                    }

                    table.add_row(vec![
                        Cell::new(p.date.to_string()),
                        Cell::new(s.transaction.id()),
                        Cell::new(&s.transaction.transaction.category).fg(Color::DarkBlue),
                        amount(sign_of(sign, p.height()), CellAlignment::Right),
                        amount(sign_of(sign, p.high), CellAlignment::Right),
                    ]);
                }
            }
        }

        table.add_row(vec![
            Cell::new("--------------")
                .add_attribute(Attribute::Bold)
                .set_alignment(CellAlignment::Right);
            5
        ]);

        for (label, series, sign) in [
            ("max income", income, Amount::from(1)),
            ("max expense", expense, Amount::from(-1)),
        ] {
            let max = series.first().map_or(Amount::ZERO, |s| s.max_height);
            table.add_row(vec![
                Cell::new(""),
                Cell::new(label).add_attribute(Attribute::Bold),
                Cell::new(""),
                Cell::new(""),
                amount(sign_of(sign, max), CellAlignment::Right).add_attribute(Attribute::Bold),
            ]);
        }

        write_table(out, &table)
    }

    fn sign_of(sign: Amount, a: Amount) -> Amount {
        if sign.is_negative() { -a } else { a }
    }
}

mod accounts {
    use super::*;
    use crate::balance::AccountSeries;

    pub fn print(
        mut out: impl Write,
        accounts: &[AccountSeries],
        steps: bool,
        fmt: Fmt,
    ) -> io::Result<()> {
        match fmt {
            Fmt::Tty => print_tty(out, accounts, steps),
            Fmt::Json => writeln!(out, "{}", to_json(&accounts)?),
            Fmt::Lisp => writeln!(out, "{}", to_lisp(&accounts)?),
        }
    }

    fn print_tty(out: impl Write, accounts: &[AccountSeries], steps: bool) -> io::Result<()> {
        let header = std::iter::once(Cell::new("Date"))
            .chain(accounts.iter().map(|a| {
                Cell::new(&a.account.name).fg(if a.account.is_debt() {
                    Color::DarkYellow
                } else {
                    Color::DarkBlue
                })
            }))
            .map(|c| {
                c.add_attribute(Attribute::Bold)
                    .set_alignment(CellAlignment::Right)
            })
            .collect::<Vec<_>>();

        let mut table = Table::new();
        table.load_preset(presets::NOTHING).set_header(header);

        // every series walks the same calendar
        let points = accounts.first().map_or(0, |a| a.values.len());
        let rows = (0..points).filter(|i| steps || i % 2 == 1);

        for i in rows {
            let Some(date) = accounts.first().and_then(|a| a.values.get(i)).map(|p| p.date) else {
                continue;
            };

            let mut row = vec![Cell::new(date.to_string()).set_alignment(CellAlignment::Right)];
            row.extend(accounts.iter().map(|a| {
                a.values.get(i).map_or(Cell::new(""), |p| {
                    amount(p.value, CellAlignment::Right)
                })
            }));
            table.add_row(row);
        }

        write_table(out, &table)
    }
}

fn to_json<T: Serialize>(value: &T) -> io::Result<String> {
    serde_json::to_string(value).map_err(io::Error::other)
}

fn to_lisp<T: Serialize>(value: &T) -> io::Result<String> {
    serde_lexpr::to_string(value).map_err(io::Error::other)
}

fn write_table(mut out: impl Write, table: &Table) -> io::Result<()> {
    match writeln!(out, "{}", table) {
        Ok(_) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::BrokenPipe => Ok(()),
        Err(e) => Err(e),
    }
}

/// Returns a `Cell` displaying the amount with two decimals, red if
/// negative.
fn amount(a: Amount, align: CellAlignment) -> Cell {
    let text = if a.is_zero() {
        "0".to_string()
    } else {
        format!("{:.2}", a)
    };

    let text = if a.is_negative() {
        console::style(text).red().to_string()
    } else {
        text
    };

    Cell::new(text).set_alignment(align)
}

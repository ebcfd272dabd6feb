use crossterm::style::{style, Color, Stylize};
use prettytable::{
    format::{self, TableFormat},
    Table,
};

#[must_use]
pub fn new_format() -> TableFormat {
    format::FormatBuilder::new()
        .column_separator(' ')
        .borders(' ')
        .separators(
            &[format::LinePosition::Title],
            format::LineSeparator::new('-', ' ', ' ', ' '),
        )
        .indent(3)
        .padding(0, 0)
        .build()
}

#[must_use]
pub fn one_column_table<'a>(head: &str, items: impl Iterator<Item = &'a str>) -> Table {
    let mut table = Table::new();

    let fmt = new_format();
    table.set_format(fmt);
    table.set_titles(row![bF=> head]);

    for item in items {
        table.add_row(row![item]);
    }
    table
}

#[must_use]
pub fn two_column_table<'a>(
    heads: (&str, &str),
    rows: impl Iterator<Item = (&'a str, &'a str)>,
) -> Table {
    let mut table = Table::new();

    let fmt = new_format();
    table.set_format(fmt);
    table.set_titles(row![bF=> heads.0, heads.1]);

    for (left, right) in rows {
        table.add_row(row![left, right]);
    }
    table
}

pub fn print_project_path(path: &str) {
    let path = style(path)
        .with(Color::Rgb {
            r: 0xAA,
            g: 0xAA,
            b: 0xAA,
        })
        .bold();
    println!(" {path}");
}

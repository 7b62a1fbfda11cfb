//! Terminal output helpers shared by the command handlers.

use colored::Colorize;

use hark_orchestrator::{Level, Message};

/// Print rows under a magenta header, columns left-aligned to their widest cell.
pub fn print_table(headers: &[&str], rows: &[Vec<String>]) {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.len()).collect();
    for row in rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.len());
        }
    }

    let header = headers
        .iter()
        .zip(&widths)
        .map(|(h, w)| format!("{:<w$}", h, w = *w))
        .collect::<Vec<_>>()
        .join("  ");
    println!("{}", header.trim_end().magenta());

    for row in rows {
        let line = row
            .iter()
            .zip(&widths)
            .map(|(cell, w)| format!("{:<w$}", cell, w = *w))
            .collect::<Vec<_>>()
            .join("  ");
        println!("{}", line.trim_end());
    }
}

pub fn print_messages(messages: &[Message]) {
    for message in messages {
        match message.level {
            Level::Info => println!("{}", message.text.green()),
            Level::Error => eprintln!("{}", message.text.red()),
        }
    }
}

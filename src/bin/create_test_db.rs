use std::error::Error;
use std::path::Path;
use std::process::exit;

use clap::Parser;
use rusqlite::Connection;

use bounty_board::{
    MemberName, NewLedgerEntry, NewMember, create_member, initialize_db, insert_ledger_entry,
};

/// A utility for creating a test database for the REST API server of bounty_board.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// File path to save the SQLite database to.
    #[arg(long, short)]
    output_path: String,
}

/// Create and populate a database for manual testing.
fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    let output_path = Path::new(&args.output_path);

    match output_path.extension() {
        None => {
            eprintln!("Output path must include a file extension (e.g., 'my_database.db').");
            exit(1);
        }
        Some(extension) if extension.is_empty() => {
            eprintln!("Output path must include a file extension (e.g., 'my_database.db').");
            exit(1);
        }
        _ => {}
    }

    if output_path.is_file() {
        eprintln!("File already exists at {output_path:#?}!");
        exit(1);
    }

    println!("Creating database at {output_path:#?}");
    let conn = Connection::open(output_path)?;

    initialize_db(&conn)?;

    println!("Creating test members...");

    for (order, name) in ["Ann", "Binh", "Chi"].into_iter().enumerate() {
        create_member(
            NewMember {
                order: order as i64 + 1,
                name: MemberName::new(name)?,
                image: None,
            },
            &conn,
        )?;
    }

    println!("Creating test ledger entries...");

    let transfers = [
        ("2025-03-01 09:15:00", 100_000.0, 0.0, 100_000.0, "Ann donation"),
        ("2025-03-05 18:40:00", 250_000.0, 0.0, 350_000.0, "Binh donation"),
        ("2025-03-10 12:00:00", 0.0, 170_000.0, 180_000.0, "Bounty payout"),
    ];

    for (transaction_date, amount_in, amount_out, accumulated, content) in transfers {
        insert_ledger_entry(
            NewLedgerEntry {
                gateway: Some("TPBank".to_owned()),
                transaction_date: transaction_date.to_owned(),
                account_number: Some("10001009980".to_owned()),
                sub_account: None,
                amount_in,
                amount_out,
                accumulated,
                code: None,
                transaction_content: Some(content.to_owned()),
                reference_number: None,
                body: None,
            },
            &conn,
        )?;
    }

    println!("Success!");

    Ok(())
}

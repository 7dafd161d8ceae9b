// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2025 Daniel Negri
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

use cashpoint_rs::{
    ClaimCode, CorrelationId, Currency, Denomination, Engine, WithdrawalRequest,
};
use clap::Parser;
use csv::{ReaderBuilder, Trim, Writer};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, Read, Write};
use std::path::PathBuf;
use std::process;
use tracing_subscriber::EnvFilter;

/// Cashpoint - Exercise a cash-dispensing engine from an operations CSV
///
/// Reads machine operations from a CSV file and outputs the final note
/// inventory to stdout. Supports loading notes, withdrawals, reservations,
/// and claim-code redemptions.
#[derive(Parser, Debug)]
#[command(name = "cashpoint-rs")]
#[command(about = "A cash-dispensing engine driven by an operations CSV", long_about = None)]
struct Args {
    /// Path to CSV file with operations
    ///
    /// Expected format: op,currency,denomination,count,amount,owner,code
    /// Example: cargo run -- operations.csv > inventory.csv
    #[arg(value_name = "FILE")]
    input: PathBuf,
}

fn main() {
    // Operational logs go to stderr; stdout carries the inventory CSV.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let file = match File::open(&args.input) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("Error opening file '{}': {}", args.input.display(), e);
            process::exit(1);
        }
    };

    let engine = match process_operations(BufReader::new(file)) {
        Ok(engine) => engine,
        Err(e) => {
            eprintln!("Error processing operations: {}", e);
            process::exit(1);
        }
    };

    if let Err(e) = write_inventory(&engine, std::io::stdout()) {
        eprintln!("Error writing output: {}", e);
        process::exit(1);
    }
}

/// Raw CSV record matching the input format.
///
/// Fields: `op, currency, denomination, count, amount, owner, code`
#[derive(Debug, Deserialize)]
struct CsvRecord {
    op: String,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    currency: Option<Currency>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    denomination: Option<u32>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    count: Option<u32>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    amount: Option<Decimal>,
    #[serde(default)]
    owner: Option<String>,
    #[serde(default)]
    code: Option<String>,
}

#[derive(Debug)]
enum Operation {
    Load {
        denomination: Denomination,
        count: u32,
    },
    Withdraw {
        currency: Currency,
        amount: Decimal,
    },
    Reserve {
        currency: Currency,
        amount: Decimal,
        owner: String,
    },
    Redeem {
        code: ClaimCode,
    },
}

impl CsvRecord {
    /// Converts a CSV record to an operation.
    ///
    /// Returns `None` for unknown operations or missing required fields.
    fn into_operation(self) -> Option<Operation> {
        match self.op.to_lowercase().as_str() {
            "load" => {
                let face = self.denomination.filter(|&f| f > 0)?;
                Some(Operation::Load {
                    denomination: Denomination::new(self.currency?, face),
                    count: self.count?,
                })
            }
            "withdraw" => Some(Operation::Withdraw {
                currency: self.currency?,
                amount: self.amount?,
            }),
            "reserve" => Some(Operation::Reserve {
                currency: self.currency?,
                amount: self.amount?,
                owner: self.owner.filter(|o| !o.is_empty())?,
            }),
            "redeem" => {
                let code = self.code.filter(|c| !c.is_empty())?;
                Some(Operation::Redeem {
                    code: ClaimCode(code),
                })
            }
            _ => None,
        }
    }
}

/// Process operations from a CSV reader.
///
/// Streaming parse: arbitrarily large files are handled without loading
/// them into memory. Malformed rows and unknown operations are skipped;
/// business failures (insufficient funds, infeasible amounts, unknown
/// claim codes) are logged and do not stop processing.
///
/// # CSV Format
///
/// Expected columns: `op, currency, denomination, count, amount, owner, code`
/// - `op`: Operation (load, withdraw, reserve, redeem)
/// - `currency`: Currency code (RUB, USD, EUR)
/// - `denomination`: Note face value (load only)
/// - `count`: Number of notes (load only)
/// - `amount`: Decimal amount (withdraw/reserve)
/// - `owner`: Owner id (reserve only)
/// - `code`: Claim code (redeem only)
///
/// # Example
///
/// ```csv
/// op,currency,denomination,count,amount,owner,code
/// load,RUB,1000,50,,,
/// load,RUB,500,100,,,
/// withdraw,RUB,,,1500,,
/// reserve,RUB,,,1000,alice,
/// ```
///
/// # Errors
///
/// Returns a CSV error if the reader fails or the CSV structure is invalid.
pub fn process_operations<R: Read>(reader: R) -> Result<Engine, csv::Error> {
    let engine = Engine::new();

    let mut rdr = ReaderBuilder::new()
        .trim(Trim::All) // Handle whitespace in fields like " load "
        .flexible(true) // Allow trailing fields to be omitted
        .has_headers(true)
        .from_reader(reader);

    for result in rdr.deserialize::<CsvRecord>() {
        match result {
            Ok(record) => {
                let Some(operation) = record.into_operation() else {
                    tracing::debug!("skipping invalid operation record");
                    continue;
                };

                match operation {
                    Operation::Load {
                        denomination,
                        count,
                    } => engine.load(denomination, count),
                    Operation::Withdraw { currency, amount } => {
                        // The external layer supplies the correlation id
                        // when the caller omits one.
                        let result = engine.withdraw(WithdrawalRequest::new(
                            currency,
                            amount,
                            CorrelationId::generate(),
                        ));
                        tracing::info!(
                            status = ?result.status,
                            dispensed = %result.dispensed_amount,
                            "withdraw processed"
                        );
                    }
                    Operation::Reserve {
                        currency,
                        amount,
                        owner,
                    } => {
                        let result = engine.reserve(&owner, currency, amount, None, None);
                        tracing::info!(
                            status = ?result.status,
                            claim_code = ?result.claim_code,
                            "reserve processed"
                        );
                    }
                    Operation::Redeem { code } => {
                        let result = engine.redeem(&code);
                        tracing::info!(status = ?result.status, %code, "redeem processed");
                    }
                }
            }
            Err(e) => {
                tracing::debug!("skipping malformed row: {}", e);
                continue;
            }
        }
    }

    Ok(engine)
}

/// One inventory line in the output CSV.
#[derive(Debug, Serialize)]
struct InventoryRow {
    currency: Currency,
    denomination: u32,
    count: u32,
}

/// Write the final note inventory to a CSV writer.
///
/// Rows are sorted by currency, then by face value descending.
///
/// # Example
///
/// ```csv
/// currency,denomination,count
/// RUB,1000,49
/// RUB,500,99
/// ```
///
/// # Errors
///
/// Returns a CSV error if writing fails.
pub fn write_inventory<W: Write>(engine: &Engine, writer: W) -> Result<(), csv::Error> {
    let mut wtr = Writer::from_writer(writer);

    let mut rows: Vec<(Denomination, u32)> = engine.snapshot().into_iter().collect();
    rows.sort_by(|a, b| {
        a.0.currency()
            .cmp(&b.0.currency())
            .then(b.0.face_value().cmp(&a.0.face_value()))
    });

    for (denomination, count) in rows {
        wtr.serialize(InventoryRow {
            currency: denomination.currency(),
            denomination: denomination.face_value(),
            count,
        })?;
    }

    wtr.flush()?;
    Ok(())
}

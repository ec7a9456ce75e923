//! Schema descriptor and database bootstrap.
//!
//! The descriptor is the static text handed to the generation service so it
//! knows which tables and columns exist. `setup_database` creates and seeds
//! the same tables the descriptor documents, so the two must be kept in sync
//! by hand.

use crate::error::{GatewayError, Result};
use rusqlite::Connection;
use std::path::Path;

/// Static description of the target database, sent verbatim to the
/// generation service as context. Ends with the instruction that pins the
/// model to emitting SQL only.
pub const SCHEMA_DESCRIPTOR: &str = r#"The SQLite database contains 3 tables:

1. Clientes:
   - cliente_id (INTEGER PRIMARY KEY)
   - nome (TEXT)
   - email (TEXT)
   - data_cadastro (TEXT)

2. Produtos:
   - produto_id (INTEGER PRIMARY KEY)
   - nome (TEXT)
   - preco (REAL)
   - estoque (INTEGER)

3. Vendas:
   - venda_id (INTEGER PRIMARY KEY)
   - cliente_id (INTEGER) - foreign key to Clientes.cliente_id
   - produto_id (INTEGER) - foreign key to Produtos.produto_id
   - quantidade (INTEGER)
   - data_venda (TEXT)

Your task is to CONVERT the user's request into a single valid SQLite query.
Do NOT include any explanation, only the SQL statement."#;

/// Create the tables and seed the demonstration rows. Idempotent: safe to
/// run against an already-initialized database.
pub fn setup_database(path: impl AsRef<Path>) -> Result<()> {
    let conn = Connection::open(path.as_ref())
        .map_err(|e| GatewayError::Database(format!("Failed to open database: {}", e)))?;

    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS Clientes (
            cliente_id INTEGER PRIMARY KEY,
            nome TEXT NOT NULL,
            email TEXT UNIQUE NOT NULL,
            data_cadastro TEXT
        );

        CREATE TABLE IF NOT EXISTS Produtos (
            produto_id INTEGER PRIMARY KEY,
            nome TEXT NOT NULL,
            preco REAL NOT NULL,
            estoque INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS Vendas (
            venda_id INTEGER PRIMARY KEY,
            cliente_id INTEGER,
            produto_id INTEGER,
            quantidade INTEGER NOT NULL,
            data_venda TEXT,
            FOREIGN KEY (cliente_id) REFERENCES Clientes (cliente_id),
            FOREIGN KEY (produto_id) REFERENCES Produtos (produto_id)
        );

        INSERT OR IGNORE INTO Clientes VALUES (1, 'Alice Silva', 'alice@email.com', '2023-01-15');
        INSERT OR IGNORE INTO Clientes VALUES (2, 'Bruno Costa', 'bruno@email.com', '2023-02-20');

        INSERT OR IGNORE INTO Produtos VALUES (101, 'Notebook', 4500.00, 5);
        INSERT OR IGNORE INTO Produtos VALUES (102, 'Mouse Gamer', 150.00, 50);

        INSERT OR IGNORE INTO Vendas VALUES (1, 1, 101, 1, '2023-10-01');
        INSERT OR IGNORE INTO Vendas VALUES (2, 2, 102, 2, '2023-10-05');
        INSERT OR IGNORE INTO Vendas VALUES (3, 1, 102, 1, '2023-10-10');
        "#,
    )
    .map_err(|e| GatewayError::Database(format!("Failed to initialize schema: {}", e)))?;

    Ok(())
}

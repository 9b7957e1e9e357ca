//! Super-admin password hashing utility
//!
//! Prints the `SUPER_ADMIN_PASSWORD_HASH` line for the API server's
//! environment, so the plaintext password is never stored.
//!
//! Usage:
//!   cargo run --bin hash-password
//!   cargo run --bin hash-password "MySecurePassword123!"

use dineflow_api::auth::hash_password;
use std::env;
use std::io::{self, Write};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let password = if let Some(pwd) = env::args().nth(1) {
        pwd
    } else {
        // Read from stdin so the password stays out of the process list
        print!("Enter super-admin password: ");
        io::stdout().flush()?;

        let mut password = String::new();
        io::stdin().read_line(&mut password)?;
        password.trim().to_string()
    };

    if password.is_empty() {
        eprintln!("Error: Password cannot be empty");
        std::process::exit(1);
    }

    if password.len() < 12 {
        eprintln!("Warning: Password is less than 12 characters. Consider using a longer password.");
    }

    let password_hash = hash_password(&password)?;

    println!("\nAdd this to the API server environment:\n");
    // Single quotes keep the `$` segments literal in shells and .env files
    println!("SUPER_ADMIN_PASSWORD_HASH='{}'", password_hash);

    Ok(())
}

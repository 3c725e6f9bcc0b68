//! Staff password hashing.
//!
//! Prints an Argon2 PHC string for `ADMIN_PASSWORD_HASH`. The password is
//! read from standard input so it stays out of shell history:
//!
//! ```bash
//! jmd-cli hash-password < password.txt
//! ```

use std::io::BufRead;

use jmd_tiffins_admin::services::hash_password;

use super::CommandError;

/// Read one line from `input` and return its Argon2 hash.
pub fn hash_from(input: impl BufRead) -> Result<String, CommandError> {
    let password = input
        .lines()
        .next()
        .transpose()
        .map_err(|e| CommandError::Password(e.to_string()))?
        .ok_or_else(|| CommandError::Password("no password on standard input".to_string()))?;

    hash_password(password.trim_end_matches('\r')).map_err(|e| CommandError::Password(e.to_string()))
}

/// Hash the password on standard input and print it.
pub fn run() -> Result<(), CommandError> {
    let hash = hash_from(std::io::stdin().lock())?;

    #[allow(clippy::print_stdout)]
    {
        println!("{hash}");
    }
    Ok(())
}

// `safezone-server secret`: generate a random secret for JWT_SECRET_KEY.

use colored::Colorize;

use safezone::crypto::random_hex;

pub fn run() -> Result<(), Box<dyn std::error::Error>> {
    let secret = generate_secret();

    println!();
    println!("Add the following to your .env file:");
    println!();
    println!("{}", "# Token signing secret".dimmed());
    println!("{}", format!("JWT_SECRET_KEY={secret}").green());
    println!();

    Ok(())
}

/// 32 random bytes, hex encoded.
fn generate_secret() -> String {
    random_hex(32)
}

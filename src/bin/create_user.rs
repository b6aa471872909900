use anyhow::{anyhow, bail, Context, Result};
use clap::Parser;

use tag2qr::db::connection::{init_pool, run_migrations};
use tag2qr::db::repository;
use tag2qr::models::validate_name;
use tag2qr::settings::Settings;

/// Provision a tenant. Its id is the bearer token for the HTTP API.
#[derive(Parser, Debug)]
#[command(name = "create-user", version, about)]
struct Cli {
    /// Email address identifying the user
    email: String,

    /// Also create the user's store with this name
    #[arg(long)]
    store_name: Option<String>,

    /// Print the result as JSON
    #[arg(long)]
    json: bool,
}

/// Trimmed `--store-name`, if one was given and is a valid store name.
fn store_name(raw: Option<&str>) -> Result<Option<&str>> {
    match raw.map(str::trim).filter(|n| !n.is_empty()) {
        Some(name) => {
            validate_name(name).map_err(|e| anyhow!("invalid --store-name: {}", e))?;
            Ok(Some(name))
        }
        None => Ok(None),
    }
}

fn main() -> Result<()> {
    dotenv::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    let email = cli.email.trim().to_lowercase();
    if !email.contains('@') {
        bail!("{:?} is not an email address", cli.email);
    }
    let requested_store = store_name(cli.store_name.as_deref())?;

    let settings = Settings::load().context("failed to load settings")?;
    let pool = init_pool(&settings.database).context("failed to create database pool")?;
    let conn = &mut pool.get().context("failed to connect to database")?;
    run_migrations(conn)?;

    let (user, created) = match repository::find_user_by_email(conn, &email)? {
        Some(user) => (user, false),
        None => (repository::create_user(conn, &email)?, true),
    };

    let store = repository::get_or_create_store(conn, user.id)?;
    if let Some(name) = requested_store {
        if store.name != name {
            repository::rename_store(conn, user.id, name)?;
        }
    }

    if cli.json {
        println!(
            "{}",
            serde_json::json!({ "id": user.id, "email": user.email, "created": created })
        );
    } else if created {
        println!("Created user {} with id {}", user.email, user.id);
    } else {
        println!("User {} already exists with id {}", user.email, user.id);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::store_name;
    use tag2qr::models::MAX_NAME_LEN;

    #[test]
    fn store_name_is_trimmed_and_length_checked() {
        assert_eq!(store_name(None).unwrap(), None);
        assert_eq!(store_name(Some("   ")).unwrap(), None);
        assert_eq!(store_name(Some("  Corner Shop ")).unwrap(), Some("Corner Shop"));

        let longest = "a".repeat(MAX_NAME_LEN);
        assert_eq!(store_name(Some(&longest)).unwrap(), Some(longest.as_str()));
        assert!(store_name(Some(&"a".repeat(MAX_NAME_LEN + 1))).is_err());
    }
}

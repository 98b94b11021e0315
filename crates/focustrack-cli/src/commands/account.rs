use clap::Subcommand;
use focustrack_core::LocalAccounts;

#[derive(Subcommand)]
pub enum AccountAction {
    /// Register a new account and sign in
    Register {
        email: String,
        /// Display name (defaults to the part of the email before '@')
        #[arg(long)]
        name: Option<String>,
    },
    /// Sign in to an existing account
    Login { email: String },
    /// Sign out; sessions are then stored locally only
    Logout,
    /// Print the signed-in account as JSON
    Whoami,
}

pub fn run(action: AccountAction) -> Result<(), Box<dyn std::error::Error>> {
    let mut accounts = LocalAccounts::open_default()?;

    match action {
        AccountAction::Register { email, name } => {
            let name = name.unwrap_or_else(|| {
                email.split('@').next().unwrap_or_default().trim().to_string()
            });
            let account = accounts.register(&email, &name)?;
            println!("{}", serde_json::to_string_pretty(&account)?);
        }
        AccountAction::Login { email } => {
            let account = accounts.login(&email)?;
            println!("{}", serde_json::to_string_pretty(&account)?);
        }
        AccountAction::Logout => {
            accounts.logout()?;
            println!("signed out");
        }
        AccountAction::Whoami => match accounts.current() {
            Some(account) => println!("{}", serde_json::to_string_pretty(account)?),
            None => println!("not signed in"),
        },
    }
    Ok(())
}

use anyhow::Context;
use clap::Parser;

/// List the most recent messages of a mailbox.
#[derive(Parser, Debug)]
#[command(name = "madmin", version)]
struct Args {
    /// IMAP server, `host` or `host:port`
    #[arg(env = "IMAP_SERVER")]
    host: String,

    #[arg(env = "IMAP_EMAIL")]
    user: String,

    #[arg(env = "IMAP_PASSWORD", hide_env_values = true)]
    password: String,

    #[arg(long, default_value = "INBOX")]
    mailbox: String,

    /// How many of the newest messages to list
    #[arg(long, default_value_t = 10)]
    count: u32,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();

    let session = mailbox::connect(&args.host, &args.user, &args.password)
        .await
        .with_context(|| format!("logging in to {}", args.host))?;

    let mut messages = session.stream_recent(&args.mailbox, args.count);
    while let Some(message) = messages
        .try_next()
        .await
        .with_context(|| format!("fetching from {}", args.mailbox))?
    {
        println!(
            "{:>8} {:>10} {}",
            message.uid(),
            message.size(),
            message.subject()
        );
    }

    messages.into_session().await?.close().await;

    Ok(())
}

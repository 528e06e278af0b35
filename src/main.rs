use clap::Parser;
use laurel::{
    DebugModeConfig, EmailConfig, MailTransport, OutputFormat, Renderer, RunMode, SmtpConfig,
    SmtpMailer, StyleConfig,
};
use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use tracing::info;

#[derive(Parser)]
#[command(
    name = "laurel",
    version,
    about = "Batch certificate generator with optional e-mail delivery"
)]
struct Cli {
    /// Content/style configuration files, merged in order (later files win)
    #[arg(long = "content-config", default_value = "config/content_config.json")]
    content_config: Vec<PathBuf>,

    /// Email template configuration
    #[arg(long, default_value = "config/email_config.json")]
    email_config: PathBuf,

    /// SMTP transport configuration
    #[arg(long, default_value = "config/smtp_config.json")]
    smtp_config: PathBuf,

    /// Debug-mode configuration (Full sends mail, Test only renders)
    #[arg(long, default_value = "config/debug_mode.json")]
    debug_config: PathBuf,

    /// Participant roster CSV with FirstName, LastName, Email columns
    #[arg(long, default_value = "participants.csv")]
    participants: PathBuf,

    /// Output directory for generated certificates
    #[arg(long, default_value = "certificates")]
    out_dir: PathBuf,

    /// Output format for the certificate artifacts
    #[arg(long, value_enum, default_value_t = FormatArg::Pdf)]
    format: FormatArg,
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum FormatArg {
    Pdf,
    Png,
}

impl From<FormatArg> for OutputFormat {
    fn from(value: FormatArg) -> Self {
        match value {
            FormatArg::Pdf => OutputFormat::Pdf,
            FormatArg::Png => OutputFormat::Png,
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "laurel=info".into()),
        )
        .init();

    let cli = Cli::parse();

    let style = StyleConfig::from_files(&cli.content_config)?;
    let debug = DebugModeConfig::load(&cli.debug_config)?;
    let mode = RunMode::normalize(&debug.debug_mode)?;
    info!(mode = mode.label(), "starting certificate batch");

    let rows = laurel::load_roster(&cli.participants)?;
    let renderer = Renderer::new(&style, &cli.out_dir, cli.format.into());

    let (mailer, send_interval) = if mode.should_send() {
        let email = EmailConfig::load(&cli.email_config)?;
        let smtp = SmtpConfig::load(&cli.smtp_config)?;
        let interval = email.send_interval();
        (Some(SmtpMailer::new(smtp, email)?), interval)
    } else {
        (None, None)
    };

    let cancel = AtomicBool::new(false);
    let summary = laurel::batch::run(
        &rows,
        |row| renderer.render(&row.name),
        mailer.as_ref().map(|mailer| mailer as &dyn MailTransport),
        mode.should_send(),
        send_interval,
        &cancel,
    );

    info!(
        processed = summary.processed,
        failed = summary.failed,
        "batch complete"
    );
    Ok(())
}

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use faceauth_core::api::{LoginResponse, RegisterResponse, StatusResponse};
use faceauth_core::{EuclideanMatcher, Matcher, DEFAULT_THRESHOLD};
use std::process::ExitCode;

mod input;

// `#[zbus::proxy]` generates `FaceAuthProxy` for the daemon interface.
#[zbus::proxy(
    interface = "io.faceauth.FaceAuth1",
    default_service = "io.faceauth.FaceAuth1",
    default_path = "/io/faceauth/FaceAuth1"
)]
trait FaceAuth {
    async fn register(&self, display_name: &str, descriptor: &[f64]) -> zbus::Result<String>;
    async fn login(&self, descriptor: &[f64]) -> zbus::Result<String>;
    async fn status(&self) -> zbus::Result<String>;
}

#[derive(Parser)]
#[command(name = "faceauth", about = "FaceAuth biometric authentication CLI")]
struct Cli {
    /// Talk to the daemon on the system bus instead of the session bus
    #[arg(long, global = true)]
    system: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Enroll a face descriptor, replacing any enrolled identity
    Register {
        /// Display name for the identity (defaults to "User")
        #[arg(short, long, default_value = "")]
        name: String,
        /// JSON descriptor file, or `-` for stdin
        descriptor: String,
    },
    /// Authenticate a face descriptor against the enrolled identity
    Login {
        /// JSON descriptor file, or `-` for stdin
        descriptor: String,
    },
    /// Show whether an identity is enrolled
    Status,
    /// Compare two descriptor files locally (no daemon)
    Compare {
        /// Reference descriptor file
        reference: String,
        /// Candidate descriptor file
        candidate: String,
        /// Match threshold
        #[arg(short, long, default_value_t = DEFAULT_THRESHOLD)]
        threshold: f64,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Register { name, descriptor } => {
            let values = input::read_descriptor(&descriptor)?;
            let proxy = connect(cli.system).await?;
            let reply = proxy
                .register(&name, &to_f64(&values))
                .await
                .context("register call failed")?;
            let response: RegisterResponse = serde_json::from_str(&reply)?;
            println!("{}", response.message);
            println!("Registered as: {}", response.display_name);
            Ok(ExitCode::SUCCESS)
        }
        Commands::Login { descriptor } => {
            let values = input::read_descriptor(&descriptor)?;
            let proxy = connect(cli.system).await?;
            let reply = proxy
                .login(&to_f64(&values))
                .await
                .context("login call failed")?;
            let response: LoginResponse = serde_json::from_str(&reply)?;
            println!("{}", response.message);
            if let Some(name) = &response.display_name {
                println!("Welcome, {name}");
            }
            if let Some(confidence) = response.confidence_percent {
                println!("Confidence: {confidence:.2}%");
            }
            Ok(if response.success {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
        Commands::Status => {
            let proxy = connect(cli.system).await?;
            let reply = proxy.status().await.context("status call failed")?;
            let response: StatusResponse = serde_json::from_str(&reply)?;
            match response.display_name {
                Some(name) if response.enrolled => println!("Enrolled: {name}"),
                _ => println!("No identity enrolled"),
            }
            Ok(ExitCode::SUCCESS)
        }
        Commands::Compare {
            reference,
            candidate,
            threshold,
        } => {
            let reference = input::read_descriptor(&reference)?;
            let candidate = input::read_descriptor(&candidate)?;
            let verdict = EuclideanMatcher.compare(&candidate, &reference, threshold)?;
            println!("distance:   {:.6}", verdict.distance);
            println!("confidence: {:.2}%", verdict.confidence_percent);
            println!("threshold:  {threshold}");
            println!("match:      {}", if verdict.is_match { "yes" } else { "no" });
            Ok(if verdict.is_match {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
    }
}

async fn connect(system: bool) -> Result<FaceAuthProxy<'static>> {
    let conn = if system {
        zbus::Connection::system().await
    } else {
        zbus::Connection::session().await
    }
    .context("connecting to D-Bus")?;
    tracing::debug!(system, "connected to bus");
    FaceAuthProxy::new(&conn)
        .await
        .context("creating faceauthd proxy")
}

fn to_f64(values: &[f32]) -> Vec<f64> {
    values.iter().map(|&v| f64::from(v)).collect()
}

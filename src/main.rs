use std::env;
use std::sync::Arc;

use anyhow::{bail, Context};
use chrono::Local;
use clap::{Parser, Subcommand};
use dotenv::dotenv;
use tracing::{info, warn};

use remote_health::api::ApiClient;
use remote_health::config::Config;
use remote_health::credentials::FileCredentialStore;
use remote_health::dashboard::{load_clinical_overview, load_patient_dashboard, DashboardView};
use remote_health::graceful_shutdown::shutdown_on_signal;
use remote_health::guard::{RouteDecision, RouteGuard};
use remote_health::http_utils::check_api_connection;
use remote_health::messaging::{format_partner_timestamp, initials, MessagingSession};
use remote_health::models::{Message, RegisterRequest, UserRole, VitalSigns};
use remote_health::session::AuthSession;
use remote_health::simulator::{run_live_vitals, run_simulator, LiveVitals};
use remote_health::vitals::{assess, matching_diseases};

#[derive(Parser)]
#[command(name = "remote-health", about = "Command-line client for the remote health monitoring API")]
struct Cli {
    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Check that the API answers
    Check,
    Login {
        email: String,
        /// Falls back to REMOTE_HEALTH_PASSWORD
        #[arg(long)]
        password: Option<String>,
    },
    Register {
        email: String,
        #[arg(long)]
        first_name: String,
        #[arg(long)]
        last_name: String,
        #[arg(long, value_parser = parse_role, default_value = "PATIENT")]
        role: UserRole,
        #[arg(long)]
        doctor_code: Option<String>,
        #[arg(long)]
        password: Option<String>,
    },
    Logout,
    Whoami,
    /// List patient records (doctors and admins)
    Patients,
    Patient { id: i64 },
    /// Vital-sign history with abnormal readings marked
    Vitals { patient_id: i64 },
    AddVitals {
        patient_id: i64,
        #[arg(long)]
        heart_rate: f64,
        #[arg(long)]
        temperature: f64,
        #[arg(long)]
        spo2: f64,
        #[arg(long)]
        systolic: Option<f64>,
        #[arg(long)]
        diastolic: Option<f64>,
    },
    Alerts {
        #[arg(long)]
        patient: Option<i64>,
        #[arg(long)]
        active: bool,
    },
    ResolveAlert { id: i64 },
    Partners,
    /// Show a conversation, optionally send a message or keep polling
    Chat {
        partner_id: i64,
        #[arg(long)]
        send: Option<String>,
        #[arg(long)]
        watch: bool,
    },
    Thresholds {
        /// Only the thresholds configured for this disease
        #[arg(long)]
        disease: Option<String>,
    },
    Dashboard,
    /// Print simulated live vitals until interrupted
    Simulate {
        #[arg(long)]
        ticks: Option<usize>,
        /// Show the live vitals card instead of full readings
        #[arg(long)]
        live: bool,
    },
}

fn parse_role(value: &str) -> Result<UserRole, String> {
    match value.to_uppercase().as_str() {
        "PATIENT" => Ok(UserRole::Patient),
        "DOCTOR" => Ok(UserRole::Doctor),
        "ADMIN" => Ok(UserRole::Admin),
        other => Err(format!("unknown role {other}")),
    }
}

fn password(arg: Option<String>) -> anyhow::Result<String> {
    arg.or_else(|| env::var("REMOTE_HEALTH_PASSWORD").ok())
        .context("pass --password or set REMOTE_HEALTH_PASSWORD")
}

fn print_vitals(reading: &VitalSigns) {
    let assessment = assess(reading);
    let flag = if assessment.is_normal() {
        String::new()
    } else {
        let names: Vec<String> = assessment.flagged.iter().map(|v| v.to_string()).collect();
        format!("  ABNORMAL: {}", names.join(", "))
    };
    let num = |v: Option<f64>| v.map(|v| v.to_string()).unwrap_or_else(|| "-".into());
    println!(
        "{:<27} HR {:>5}  BP {:>5}/{:<5}  T {:>4}  SpO2 {:>4}{}",
        reading.timestamp.as_deref().unwrap_or("-"),
        num(reading.heart_rate),
        num(reading.systolic),
        num(reading.diastolic),
        num(reading.temperature),
        num(reading.oxygen_saturation),
        flag
    );
}

fn print_live_vitals(live: &LiveVitals) {
    let cards: Vec<String> = live
        .vitals
        .iter()
        .map(|v| {
            let mut card = format!("{} {:.1}{} {:?}", v.name(), v.value, v.unit(), v.trend);
            if let Some(beat) = v.heartbeat() {
                card.push_str(&format!(" ({:?})", beat));
            }
            if v.is_abnormal() {
                card.push_str(" !");
            }
            card
        })
        .collect();
    println!("{}", cards.join(" | "));
}

fn print_message(msg: &Message, me: i64) {
    let who = if msg.sender_id == me { "me" } else { "them" };
    let pending = if msg.id.is_pending() { " (sending)" } else { "" };
    println!("[{}] {:>4}: {}{}", msg.timestamp, who, msg.content, pending);
}

/// Restores the session and applies the guard, the way a protected page would.
async fn require(session: &mut AuthSession, guard: RouteGuard) -> anyhow::Result<()> {
    session.initialize().await;
    match guard.check(session.state()) {
        RouteDecision::Allow => Ok(()),
        RouteDecision::Redirect("/login") => bail!("not logged in, run `remote-health login` first"),
        RouteDecision::Redirect(_) => bail!("this command is not available for your role"),
        RouteDecision::Pending => bail!("session is still loading"),
    }
}

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(if cli.verbose { tracing::Level::DEBUG } else { tracing::Level::INFO })
        .init();

    dotenv().ok();

    let config = Config::from_env()?;
    let store = Arc::new(FileCredentialStore::new(&config.credentials_path));
    let client = ApiClient::new(&config.api_base_url, store, config.request_timeout)?;
    let mut session = AuthSession::new(client.clone());

    match cli.command {
        Command::Check => {
            check_api_connection(&config.api_base_url, config.connect_attempts, config.connect_retry).await?;
        }
        Command::Login { email, password: pw } => {
            let pw = password(pw)?;
            let user = session.login(&email, &pw).await?;
            println!("Logged in as {} ({})", user.display_name(), user.role);
        }
        Command::Register { email, first_name, last_name, role, doctor_code, password: pw } => {
            let request = RegisterRequest {
                email,
                password: password(pw)?,
                first_name,
                last_name,
                role,
                doctor_code,
            };
            let user = session.register(&request).await?;
            println!("Registered {} ({})", user.display_name(), user.role);
        }
        Command::Logout => {
            session.logout()?;
            println!("Logged out");
        }
        Command::Whoami => {
            require(&mut session, RouteGuard::authenticated()).await?;
            if let Some(user) = session.user() {
                println!("{} <{}> {} id={}", user.display_name(), user.email, user.role, user.id);
            }
        }
        Command::Patients => {
            require(&mut session, RouteGuard::for_roles(&[UserRole::Doctor, UserRole::Admin])).await?;
            let patients = match session.user().map(|u| u.role) {
                Some(UserRole::Doctor) => client.patients().doctor_patients().await?,
                _ => client.patients().list().await?,
            };
            for p in &patients {
                println!(
                    "{:>5}  user {:>5}  {:<28} {}",
                    p.id.map(|id| id.to_string()).unwrap_or_default(),
                    p.user_id,
                    p.display_name(),
                    p.chronic_disease_list().join(", ")
                );
            }
            info!("{} patients", patients.len());
        }
        Command::Patient { id } => {
            require(&mut session, RouteGuard::for_roles(&[UserRole::Doctor, UserRole::Admin])).await?;
            let patient = client.patients().get(id).await?;
            println!("{}", serde_json::to_string_pretty(&patient)?);
        }
        Command::Vitals { patient_id } => {
            require(&mut session, RouteGuard::authenticated()).await?;
            let vitals = client.patients().vitals(patient_id).await?;
            if vitals.is_empty() {
                println!("No vital signs recorded");
            }
            vitals.iter().for_each(print_vitals);
        }
        Command::AddVitals { patient_id, heart_rate, temperature, spo2, systolic, diastolic } => {
            require(&mut session, RouteGuard::authenticated()).await?;
            let reading = VitalSigns {
                heart_rate: Some(heart_rate),
                temperature: Some(temperature),
                oxygen_saturation: Some(spo2),
                systolic,
                diastolic,
                source: Some("manual".into()),
                ..Default::default()
            };
            let saved = client.patients().add_vitals(patient_id, &reading).await?;
            print_vitals(&saved);
        }
        Command::Alerts { patient, active } => {
            require(&mut session, RouteGuard::authenticated()).await?;
            let alerts = match (patient, active) {
                (Some(id), _) => client.alerts().for_patient(id).await?,
                (None, true) => client.alerts().active().await?,
                (None, false) => client.alerts().list().await?,
            };
            for a in alerts.iter().filter(|a| !active || a.is_active()) {
                println!(
                    "{:>5}  patient {:>5}  {:<8?} {:<8?} {}  {}",
                    a.id, a.patient_id, a.alert_type, a.status(), a.timestamp, a.message
                );
            }
        }
        Command::ResolveAlert { id } => {
            require(&mut session, RouteGuard::for_roles(&[UserRole::Doctor, UserRole::Admin])).await?;
            let alert = client.alerts().resolve(id).await?;
            println!("Alert {} is now {:?}", alert.id, alert.status());
        }
        Command::Partners => {
            require(&mut session, RouteGuard::authenticated()).await?;
            let user = session.user().cloned().context("no user")?;
            let mut messaging = MessagingSession::new(client.clone(), user);
            messaging.load_partners().await?;
            let now = Local::now();
            for p in messaging.inbox().partners() {
                println!(
                    "{:>5}  [{}] {:<24} {:<8} {:>10}  {}{}",
                    p.id,
                    initials(&p.name),
                    p.name,
                    p.role,
                    p.last_message_timestamp
                        .as_deref()
                        .map(|ts| format_partner_timestamp(ts, &now))
                        .unwrap_or_default(),
                    p.last_message.as_deref().unwrap_or("No messages yet."),
                    match p.unread_count {
                        Some(n) if n > 0 => format!("  ({n} unread)"),
                        _ => String::new(),
                    }
                );
            }
        }
        Command::Chat { partner_id, send, watch } => {
            require(&mut session, RouteGuard::authenticated()).await?;
            let user = session.user().cloned().context("no user")?;
            let me = user.id;
            let mut messaging = MessagingSession::new(client.clone(), user)
                .with_poll_interval(config.message_poll_interval);
            messaging.select(partner_id).await?;
            for msg in messaging.inbox().messages() {
                print_message(msg, me);
            }
            if let Some(text) = send {
                match messaging.send(&text).await {
                    Ok(Some(msg)) => print_message(&msg, me),
                    Ok(None) => warn!("Nothing to send"),
                    Err(err) => bail!("message not sent, draft kept: {:?} ({})", messaging.inbox().draft, err),
                }
            }
            if watch {
                let mut seen = messaging.inbox().messages().len();
                messaging
                    .poll_until(shutdown_on_signal(), |inbox| {
                        for msg in inbox.messages().iter().skip(seen) {
                            print_message(msg, me);
                        }
                        seen = inbox.messages().len();
                    })
                    .await;
            }
        }
        Command::Thresholds { disease } => {
            require(&mut session, RouteGuard::authenticated()).await?;
            let thresholds = match disease {
                Some(disease) => client.thresholds().for_disease(&disease).await?,
                None => client.thresholds().list().await,
            };
            for t in thresholds {
                println!(
                    "{:>3} {:<14} HR {}-{}  T {}-{}  SpO2 {}-{}  BP {}-{}/{}-{}",
                    t.id,
                    t.disease,
                    t.heart_rate_min,
                    t.heart_rate_max,
                    t.temperature_min,
                    t.temperature_max,
                    t.spo2_min,
                    t.spo2_max,
                    t.systolic_bp_min,
                    t.systolic_bp_max,
                    t.diastolic_bp_min,
                    t.diastolic_bp_max
                );
            }
        }
        Command::Dashboard => {
            require(&mut session, RouteGuard::authenticated()).await?;
            let user = session.user().cloned().context("no user")?;
            if user.role != UserRole::Patient {
                let overview = load_clinical_overview(&client).await?;
                println!(
                    "{} patients, {} active alerts ({} critical)",
                    overview.patients, overview.active_alerts, overview.critical_alerts
                );
                for (disease, count) in &overview.chronic_diseases {
                    println!("  {:<24} {}", disease, count);
                }
                return Ok(());
            }
            match load_patient_dashboard(&client, &user).await {
                DashboardView::Ready(dash) => {
                    println!("{}", dash.profile.display_name());
                    match &dash.latest {
                        Some(latest) => {
                            print_vitals(latest);
                            let thresholds = client.thresholds().list().await;
                            let diseases = matching_diseases(&thresholds, latest);
                            if !diseases.is_empty() {
                                println!("Reading fits: {}", diseases.join(", "));
                            }
                        }
                        None => println!("No vital signs recorded"),
                    }
                    for a in dash.active_alerts() {
                        println!("  {:?}: {}", a.alert_type, a.message);
                    }
                }
                DashboardView::ProfileNotFound => {
                    println!("Patient profile not found. Ask your doctor to create your record.");
                }
                DashboardView::NotPatient => println!("Dashboard is for patients"),
                DashboardView::Error(message) => bail!(message),
            }
        }
        Command::Simulate { ticks, live: true } => {
            run_live_vitals(config.simulator_tick, ticks, shutdown_on_signal(), print_live_vitals).await;
        }
        Command::Simulate { ticks, live: false } => {
            run_simulator(config.simulator_tick, ticks, shutdown_on_signal(), |reading, _| {
                print_vitals(reading)
            })
            .await;
        }
    }

    Ok(())
}

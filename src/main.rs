//!
//! careerscope CLI binary
//! ----------------------
//! Signs in against the career analysis API, submits documents for analysis and
//! follows analysis jobs until they finish. The session persists between runs in
//! the credential file (see `careerscope::config`).

use std::env;

use anyhow::{anyhow, Context, Result};
use tokio::sync::mpsc;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use careerscope::analysis::{AnalysisEvent, AnalysisJob, CareerType};
use careerscope::cli::render;
use careerscope::config::ClientConfig;
use careerscope::identity::{ProfileUpdate, Session};
use careerscope::Client;

fn print_usage(program: &str) {
    eprintln!(
        "Usage:\n  {program} login <email> <password>\n  {program} register <email> <password> [full name]\n  {program} logout\n  {program} whoami\n  {program} profile [--email E] [--name N] [--password P]\n  {program} submit <document_id> [--watch]\n  {program} watch <analysis_id>\n  {program} list [--skip N] [--limit N] [--document ID]\n  {program} paths <analysis_id> [--type corporate|freelance|entrepreneurship]\n\nEnvironment:\n  CAREERSCOPE_API_URL            API base (default http://localhost:8000/api/v1)\n  CAREERSCOPE_CREDENTIAL_FILE    where the session credential is kept\n  CAREERSCOPE_POLL_INTERVAL_MS   status poll cadence (default 3000)\n  CAREERSCOPE_POLL_MAX_ATTEMPTS  polls before giving up, 0 = never (default 200)\n  CAREERSCOPE_HTTP_TIMEOUT_MS    per-request timeout (default 30000)\n  CAREERSCOPE_CONFIG             optional JSON config file\n  CAREERSCOPE_OUTPUT=json        print JSON instead of tables\n  RUST_LOG                       log filter (default warn)"
    );
}

#[derive(Debug, PartialEq)]
enum Command {
    Login { email: String, password: String },
    Register { email: String, password: String, full_name: Option<String> },
    Logout,
    Whoami,
    Submit { document_id: i64, watch: bool },
    Watch { id: String },
    Profile { email: Option<String>, name: Option<String>, password: Option<String> },
    List { skip: u32, limit: u32, document_id: Option<i64> },
    Paths { id: String, career_type: Option<CareerType> },
    Help,
}

fn flag_value<'a>(args: &'a [String], i: usize, flag: &str) -> Result<&'a str, String> {
    args.get(i + 1).map(String::as_str).ok_or_else(|| format!("{} requires a value", flag))
}

fn parse_args(args: &[String]) -> Result<Command, String> {
    let Some(cmd) = args.first() else { return Err("missing command".into()) };
    let rest = &args[1..];
    let positional = |n: usize, what: &str| -> Result<String, String> {
        rest.get(n).filter(|s| !s.starts_with("--")).cloned().ok_or_else(|| format!("{} requires <{}>", cmd, what))
    };
    match cmd.as_str() {
        "-h" | "--help" | "help" => Ok(Command::Help),
        "login" => Ok(Command::Login { email: positional(0, "email")?, password: positional(1, "password")? }),
        "register" => {
            let full_name = if rest.len() > 2 { Some(rest[2..].join(" ")) } else { None };
            Ok(Command::Register { email: positional(0, "email")?, password: positional(1, "password")?, full_name })
        }
        "logout" => Ok(Command::Logout),
        "whoami" => Ok(Command::Whoami),
        "profile" => {
            let (mut email, mut name, mut password) = (None, None, None);
            let mut i = 0;
            while i < rest.len() {
                let slot = match rest[i].as_str() {
                    "--email" => &mut email,
                    "--name" => &mut name,
                    "--password" => &mut password,
                    other => return Err(format!("unknown flag '{}'", other)),
                };
                *slot = Some(flag_value(rest, i, &rest[i])?.to_string());
                i += 2;
            }
            if email.is_none() && name.is_none() && password.is_none() {
                return Err("profile needs at least one of --email, --name, --password".into());
            }
            Ok(Command::Profile { email, name, password })
        }
        "submit" => {
            let raw = positional(0, "document_id")?;
            let document_id = raw.parse::<i64>().map_err(|_| format!("document_id must be a number, got '{}'", raw))?;
            let mut watch = false;
            for a in &rest[1..] {
                match a.as_str() {
                    "--watch" | "-w" => watch = true,
                    other => return Err(format!("unknown flag '{}'", other)),
                }
            }
            Ok(Command::Submit { document_id, watch })
        }
        "watch" => Ok(Command::Watch { id: positional(0, "analysis_id")? }),
        "list" => {
            let (mut skip, mut limit, mut document_id) = (0u32, 20u32, None);
            let mut i = 0;
            while i < rest.len() {
                match rest[i].as_str() {
                    "--skip" => {
                        let v = flag_value(rest, i, "--skip")?;
                        skip = v.parse().map_err(|_| format!("--skip expects a number, got '{}'", v))?;
                        i += 2; continue;
                    }
                    "--limit" => {
                        let v = flag_value(rest, i, "--limit")?;
                        limit = v.parse().map_err(|_| format!("--limit expects a number, got '{}'", v))?;
                        i += 2; continue;
                    }
                    "--document" => {
                        let v = flag_value(rest, i, "--document")?;
                        document_id = Some(v.parse().map_err(|_| format!("--document expects a number, got '{}'", v))?);
                        i += 2; continue;
                    }
                    other => return Err(format!("unknown flag '{}'", other)),
                }
            }
            Ok(Command::List { skip, limit, document_id })
        }
        "paths" => {
            let id = positional(0, "analysis_id")?;
            let mut career_type = None;
            let mut i = 1;
            while i < rest.len() {
                match rest[i].as_str() {
                    "--type" | "-t" => {
                        let v = flag_value(rest, i, "--type")?;
                        career_type = Some(v.parse::<CareerType>().map_err(|e| e.message().to_string())?);
                        i += 2; continue;
                    }
                    other => return Err(format!("unknown flag '{}'", other)),
                }
            }
            Ok(Command::Paths { id, career_type })
        }
        other => Err(format!("unknown command '{}'", other)),
    }
}

#[tokio::main]
async fn main() {
    // Logs go to stderr so table/JSON output on stdout stays clean
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = fmt().with_env_filter(filter).with_writer(std::io::stderr).try_init();

    let mut args: Vec<String> = env::args().collect();
    let program = if args.is_empty() { "careerscope".to_string() } else { args.remove(0) };

    let cmd = match parse_args(&args) {
        Ok(Command::Help) => { print_usage(&program); return; }
        Ok(c) => c,
        Err(msg) => {
            eprintln!("{}", msg);
            print_usage(&program);
            std::process::exit(2);
        }
    };

    if let Err(e) = run(cmd).await {
        eprintln!("error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run(cmd: Command) -> Result<()> {
    let config = ClientConfig::load().context("loading configuration")?;
    info!(target: "careerscope::cli", "api={} credentials={}", config.api_base_url, config.credential_path.display());
    let client = Client::from_config(config).context("building API client")?;
    let json = render::json_output();

    match cmd {
        Command::Login { email, password } => {
            let session = client.auth().login(&email, &password).await?;
            if json { println!("{}", render::to_json(&session.identity())); } else { println!("{}", render::session(&session)); }
        }
        Command::Register { email, password, full_name } => {
            client.auth().register(&email, &password, full_name.as_deref()).await?;
            println!("registered {}; sign in with `login`", email.trim());
        }
        Command::Logout => {
            client.auth().logout();
            println!("signed out");
        }
        Command::Whoami => {
            // restore already re-fetches the profile
            let session = signed_in(&client).await?;
            if json { println!("{}", render::to_json(&session.identity())); } else { println!("{}", render::session(&session)); }
        }
        Command::Profile { email, name, password } => {
            signed_in(&client).await?;
            let update = ProfileUpdate { email, display_name: name, password };
            client.auth().update_profile(&update).await?;
            let session = client.session().current();
            if json { println!("{}", render::to_json(&session.identity())); } else { println!("{}", render::session(&session)); }
        }
        Command::Submit { document_id, watch } => {
            signed_in(&client).await?;
            let job = client.analysis().submit(document_id).await?;
            if watch {
                let id = job.id.to_string();
                follow(&client, &id, json).await?;
            } else if json {
                println!("{}", render::to_json(&job));
            } else {
                println!("{}", render::job(&job));
            }
        }
        Command::Watch { id } => {
            signed_in(&client).await?;
            follow(&client, &id, json).await?;
        }
        Command::List { skip, limit, document_id } => {
            signed_in(&client).await?;
            let rows = client.analysis().list(skip, limit, document_id).await?;
            if json { println!("{}", render::to_json(&rows)); } else { println!("{}", render::analyses(&rows)); }
        }
        Command::Paths { id, career_type } => {
            signed_in(&client).await?;
            let paths = client.analysis().career_paths(&id, career_type).await?;
            if json { println!("{}", render::to_json(&paths)); } else { println!("{}", render::career_paths(&paths)); }
        }
        Command::Help => {}
    }
    Ok(())
}

async fn signed_in(client: &Client) -> Result<Session> {
    let session = client.restore().await;
    if session.is_authenticated() {
        Ok(session)
    } else {
        Err(anyhow!("not signed in; run `careerscope login <email> <password>` first"))
    }
}

/// Print each status as it arrives and the final job once terminal. Ctrl-C cancels.
async fn follow(client: &Client, id: &str, json: bool) -> Result<()> {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let sub = client.analysis().watch(id, move |ev| {
        let _ = tx.send(ev);
    });
    let mut last: Option<AnalysisJob> = None;
    loop {
        tokio::select! {
            ev = rx.recv() => match ev {
                Some(AnalysisEvent::Snapshot(job)) => {
                    if !json { eprintln!("{}", render::status_line(&job)); }
                    last = Some(job);
                }
                Some(AnalysisEvent::StatusError(e)) => return Err(e).context(format!("polling analysis {}", id)),
                Some(AnalysisEvent::ResultError(e)) => {
                    if let Some(job) = &last { print_job(job, json); }
                    return Err(e.into());
                }
                None => break,
            },
            _ = tokio::signal::ctrl_c() => {
                sub.cancel();
                return Err(anyhow!("stopped watching analysis {}", id));
            }
        }
    }
    match last {
        Some(job) => { print_job(&job, json); Ok(()) }
        None => Err(anyhow!("polling of analysis {} ended without a status ({:?})", id, sub.state())),
    }
}

fn print_job(job: &AnalysisJob, json: bool) {
    if json { println!("{}", render::to_json(job)); } else { println!("{}", render::job(job)); }
}

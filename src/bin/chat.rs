//! Terminal chat with a running GyanMitra server
//!
//! Reads questions line by line and prints answers as they stream in.
//! `/profile <engagement> <performance>` changes the student profile,
//! `exit` quits.

use gyanmitra::client::{AskOutcome, TutorClient};
use gyanmitra::conversation::{ConversationManager, FALLBACK_MESSAGE};
use gyanmitra::tutor::StudentProfile;
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

fn env_unit(name: &str, default: f64) -> f64 {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn parse_profile(args: &str) -> Option<StudentProfile> {
    let mut parts = args.split_whitespace().map(str::parse::<f64>);
    let engagement = parts.next()?.ok()?;
    let performance = parts.next()?.ok()?;
    let profile = StudentProfile::new(engagement, performance);
    profile.validate().ok().map(|()| profile)
}

fn prompt() {
    print!("you> ");
    std::io::stdout().flush().ok();
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| "gyanmitra=warn".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let url = std::env::var("GYANMITRA_URL").unwrap_or_else(|_| "http://localhost:9002".to_string());
    let api_key = std::env::var("GOOGLE_API_KEY").ok();
    let client = TutorClient::new(&url, api_key)?;

    let defaults = StudentProfile::default();
    let mut profile = StudentProfile::new(
        env_unit("GYANMITRA_ENGAGEMENT", defaults.engagement),
        env_unit("GYANMITRA_PERFORMANCE", defaults.performance),
    );
    if let Err(e) = profile.validate() {
        eprintln!("{e}; using the default profile");
        profile = defaults;
    }

    let mut conversation = ConversationManager::new();

    println!("GyanMitra at {url}. Ask a question, or type `exit`.");
    println!(
        "Profile: engagement {:.2}, performance {:.2}",
        profile.engagement, profile.performance
    );
    prompt();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let input = line.trim();
        if input.eq_ignore_ascii_case("exit") {
            break;
        }
        if input.is_empty() {
            prompt();
            continue;
        }
        if let Some(args) = input.strip_prefix("/profile") {
            match parse_profile(args) {
                Some(p) => {
                    profile = p;
                    println!("Profile updated.");
                }
                None => println!("Usage: /profile <engagement 0-1> <performance 0-1>"),
            }
            prompt();
            continue;
        }

        print!("Thinking...");
        std::io::stdout().flush().ok();
        let mut started = false;

        let outcome = client
            .ask(&mut conversation, input, profile, |text| {
                if !started {
                    print!("\r\x1b[K");
                    started = true;
                }
                print!("{text}");
                std::io::stdout().flush().ok();
            })
            .await;

        if !started {
            print!("\r\x1b[K");
        }

        match outcome {
            Err(e) => println!("{e}"),
            Ok(AskOutcome::Skipped) => println!("Still answering the previous question."),
            Ok(AskOutcome::Failed(e)) => {
                tracing::debug!(error = %e, "Answer failed");
                if started {
                    println!("\n\n{FALLBACK_MESSAGE}");
                } else {
                    println!("{FALLBACK_MESSAGE}");
                }
            }
            Ok(AskOutcome::Completed) => {
                if started {
                    println!();
                } else if let Some(turn) = conversation.last() {
                    println!("{}", turn.content);
                    if let Some(explanation) = &turn.explanation {
                        println!("\nExplanation:\n{explanation}");
                    }
                    if let Some(difficulty) = &turn.difficulty {
                        println!("\nDifficulty: {difficulty}");
                    }
                }
            }
        }
        println!();
        prompt();
    }

    Ok(())
}

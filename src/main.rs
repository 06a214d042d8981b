mod backend;
mod cache;
mod config;
mod identity;
mod lifecycle;
mod models;
mod notify;
mod reconcile;
mod tui;

use anyhow::{Result, anyhow};
use clap::{Parser, Subcommand};
use std::cell::RefCell;
use std::rc::Rc;

use backend::HttpBackend;
use cache::CacheStore;
use config::Config;
use identity::RawUser;
use lifecycle::{ApplyOutcome, MatchSession, Outcome};
use notify::{BufferNotifier, ConsoleNotifier, Notifier};

#[derive(Parser)]
#[command(name = "stint")]
#[command(about = "Internship match companion - track interest, apply, and stay in sync")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Set up the client and create the local cache
    Init {
        /// Marketplace backend base URL
        #[arg(long)]
        base_url: String,

        /// Primary user id
        #[arg(long)]
        user_id: Option<String>,

        /// Record id as issued by older accounts
        #[arg(long)]
        record_id: Option<String>,

        /// Display name
        #[arg(long)]
        name: Option<String>,

        /// Path to a file holding the API token
        #[arg(long)]
        token_file: Option<String>,
    },

    /// Reconcile local state with the marketplace
    Sync,

    /// List interest matches
    Matches {
        /// Show the archived partition instead of active matches
        #[arg(short, long)]
        archived: bool,
    },

    /// Show one match in full
    Show {
        /// Match id (the company id)
        id: String,
    },

    /// Accept a company's interest
    Accept {
        /// Match id (the company id)
        id: String,
    },

    /// Decline a company's interest and archive it
    Decline {
        /// Match id (the company id)
        id: String,
    },

    /// Apply for a company's internship slot
    Apply {
        /// Company id
        company_id: String,

        /// Internship slot id
        slot_id: String,
    },

    /// List internship slots you have applied to
    Applications,

    /// Manage preferred applicants (company accounts)
    Shortlist {
        #[command(subcommand)]
        command: ShortlistCommands,
    },

    /// Browse matches interactively
    Browse,
}

#[derive(Subcommand)]
enum ShortlistCommands {
    /// Add a student to the shortlist
    Add {
        /// Student id
        student_id: String,

        /// Optional notes
        #[arg(short, long)]
        notes: Option<String>,
    },

    /// Remove a student from the shortlist
    Remove {
        /// Student id
        student_id: String,
    },

    /// Toggle a student's shortlist membership
    Toggle {
        /// Student id
        student_id: String,
    },

    /// List shortlisted students
    List,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Init {
            base_url,
            user_id,
            record_id,
            name,
            token_file,
        } => run_init(base_url, user_id, record_id, name, token_file),
        command => run(command),
    }
}

fn run(command: Commands) -> Result<()> {
    let cfg = Config::load()?;
    let user = identity::canonical_id(&cfg.user)
        .ok_or_else(|| anyhow!("Config has no usable user id. Re-run 'stint init'."))?;

    let store = CacheStore::open()?;
    store.init()?;
    let http = HttpBackend::new(&cfg.base_url, cfg.token.clone())?;

    // The TUI owns the screen, so its notifications go to a buffer it can
    // render; everything else toasts straight to stderr.
    let (notifier, toasts): (Box<dyn Notifier>, Option<Rc<RefCell<Vec<String>>>>) =
        if matches!(command, Commands::Browse) {
            let buffer = BufferNotifier::new();
            let handle = buffer.handle();
            (Box::new(buffer), Some(handle))
        } else {
            (Box::new(ConsoleNotifier), None)
        };

    let mut session = MatchSession::new(user, &http, &store, notifier);

    match command {
        Commands::Init { .. } => unreachable!("handled in main"),

        Commands::Sync => {
            eprintln!("Syncing with {} ...", cfg.base_url);
            let stats = session.refresh();
            if stats.from_cache {
                println!("Marketplace unreachable - matches served from the local cache.");
            } else {
                println!("Fetched {} interest record(s).", stats.fetched);
                if stats.newly_archived > 0 {
                    println!("Archived {} newly rejected match(es).", stats.newly_archived);
                }
            }
            println!(
                "Active: {}   Archived: {}   Applications: {}",
                session.matches().active.len(),
                session.matches().archived.len(),
                session.applied().len()
            );
        }

        Commands::Matches { archived } => {
            session.refresh();
            let records = if archived {
                &session.matches().archived
            } else {
                &session.matches().active
            };
            if records.is_empty() {
                println!("No {} matches.", if archived { "archived" } else { "active" });
            } else {
                println!(
                    "{:<14} {:<10} {:<24} {:<16} {:<16}",
                    "ID", "STATUS", "COMPANY", "INDUSTRY", "LOCATION"
                );
                println!("{}", "-".repeat(84));
                for record in records {
                    println!(
                        "{:<14} {:<10} {:<24} {:<16} {:<16}",
                        truncate(&record.id, 12),
                        record.status.as_str(),
                        truncate(&record.company.name, 22),
                        truncate(record.company.industry.as_deref().unwrap_or("-"), 14),
                        truncate(record.company.location.as_deref().unwrap_or("-"), 14)
                    );
                }
            }
        }

        Commands::Show { id } => {
            session.refresh();
            match session.find(&id) {
                Some(record) => {
                    let archived = session.matches().archived.iter().any(|r| r.id == id);
                    println!(
                        "Match {}{}",
                        record.id,
                        if archived { " (archived)" } else { "" }
                    );
                    println!("Company: {}", record.company.name);
                    println!("Status: {}", record.status.as_str());
                    if let Some(industry) = &record.company.industry {
                        println!("Industry: {}", industry);
                    }
                    if let Some(location) = &record.company.location {
                        println!("Location: {}", location);
                    }
                    if let Some(size) = &record.company.size {
                        println!("Size: {}", size);
                    }
                    if let Some(contact) = &record.company.contact_email {
                        println!("Contact: {}", contact);
                    }
                    if !record.skills_required.is_empty() {
                        println!("Skills: {}", record.skills_required.join(", "));
                    }
                    if let Some(details) = &record.internship_details {
                        println!("Internship: {}", details);
                    }
                    if let Some(message) = &record.message {
                        println!("\n--- Message ---\n{}", message);
                    }
                    if let Some(description) = &record.company.description {
                        println!("\n--- Company ---\n{}", description);
                    }
                }
                None => {
                    println!("No match with id '{}'.", id);
                }
            }
        }

        Commands::Accept { id } => {
            session.refresh();
            match session.accept(&id) {
                Some(Outcome::Confirmed) => {
                    println!("Accepted the match with '{}'.", id);
                }
                Some(Outcome::OptimisticPending) => {
                    println!(
                        "Accepted locally; the marketplace has not confirmed yet. \
                         It will catch up on the next sync."
                    );
                }
                None => {
                    println!("No active match with id '{}'.", id);
                }
            }
        }

        Commands::Decline { id } => {
            session.refresh();
            match session.decline(&id) {
                Some(Outcome::Confirmed) => {
                    println!("Declined and archived the match with '{}'.", id);
                }
                Some(Outcome::OptimisticPending) => {
                    println!(
                        "Declined locally; the marketplace has not confirmed yet. \
                         It will catch up on the next sync."
                    );
                }
                None => {
                    println!("No match with id '{}'.", id);
                }
            }
        }

        Commands::Apply { company_id, slot_id } => {
            session.refresh();
            match session.apply_slot(&company_id, &slot_id) {
                ApplyOutcome::Submitted => {
                    println!("Application for slot '{}' submitted.", slot_id);
                }
                ApplyOutcome::AlreadyApplied => {
                    println!("Already applied to slot '{}'.", slot_id);
                }
                ApplyOutcome::Failed => {
                    println!("Application was not recorded.");
                }
            }
        }

        Commands::Applications => {
            session.refresh();
            if session.applied().is_empty() {
                println!("No applications yet.");
            } else {
                let mut slots: Vec<&String> = session.applied().iter().collect();
                slots.sort();
                println!("Applied to {} slot(s):", slots.len());
                for slot in slots {
                    println!("  {}", slot);
                }
            }
        }

        Commands::Shortlist { command } => {
            session.refresh();
            match command {
                ShortlistCommands::Add { student_id, notes } => {
                    if session.shortlist().iter().any(|e| e.student_id == student_id) {
                        println!("'{}' is already on the shortlist.", student_id);
                    } else if session.shortlist_toggle(&student_id, notes.as_deref())
                        == Some(true)
                    {
                        println!("Added '{}' to the shortlist.", student_id);
                    } else {
                        println!("'{}' was not added.", student_id);
                    }
                }

                ShortlistCommands::Remove { student_id } => {
                    if !session.shortlist().iter().any(|e| e.student_id == student_id) {
                        println!("'{}' is not on the shortlist.", student_id);
                    } else if session.shortlist_toggle(&student_id, None) == Some(false) {
                        println!("Removed '{}' from the shortlist.", student_id);
                    } else {
                        println!("'{}' was not removed.", student_id);
                    }
                }

                ShortlistCommands::Toggle { student_id } => {
                    match session.shortlist_toggle(&student_id, None) {
                        Some(true) => println!("Added '{}' to the shortlist.", student_id),
                        Some(false) => println!("Removed '{}' from the shortlist.", student_id),
                        None => println!("Shortlist unchanged."),
                    }
                }

                ShortlistCommands::List => {
                    if session.shortlist().is_empty() {
                        println!("No shortlisted students.");
                    } else {
                        println!("{:<16} {:<18} {:<30}", "STUDENT", "ADDED", "NOTES");
                        println!("{}", "-".repeat(66));
                        for entry in session.shortlist() {
                            println!(
                                "{:<16} {:<18} {:<30}",
                                truncate(&entry.student_id, 14),
                                entry.added_at.format("%Y-%m-%d %H:%M"),
                                truncate(entry.notes.as_deref().unwrap_or("-"), 28)
                            );
                        }
                    }
                }
            }
        }

        Commands::Browse => {
            session.refresh();
            if let Some(toasts) = toasts {
                tui::run_browse(&mut session, toasts)?;
            }
        }
    }

    Ok(())
}

fn run_init(
    base_url: String,
    user_id: Option<String>,
    record_id: Option<String>,
    name: Option<String>,
    token_file: Option<String>,
) -> Result<()> {
    let user = RawUser {
        user_id,
        record_id,
        name,
    };
    let resolved = identity::canonical_id(&user)
        .ok_or_else(|| anyhow!("Provide --user-id or --record-id"))?;

    let token = match token_file {
        Some(path) => Some(config::read_token_file(&path)?),
        None => None,
    };

    let cfg = Config {
        base_url,
        token,
        user,
    };
    cfg.save()?;

    let store = CacheStore::open()?;
    store.init()?;

    println!("Configured user {} against {}", resolved, cfg.base_url);
    println!("Cache at {}", store.path().display());
    Ok(())
}

fn truncate(s: &str, max: usize) -> String {
    if s.len() <= max {
        s.to_string()
    } else {
        format!("{}...", &s[..max.saturating_sub(3)])
    }
}

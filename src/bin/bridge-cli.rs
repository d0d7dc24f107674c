use clap::{Parser, Subcommand};
use serde_json::Value;

use health_ticket_bridge::config::{self, ConfigError};
use health_ticket_bridge::ticketing::issue::{IssueFields, IssuePayload, KeyRef, NameRef};
use health_ticket_bridge::ticketing::JiraClient;

#[derive(Parser)]
#[command(name = "bridge-cli")]
#[command(about = "Management CLI for the health-ticket bridge", long_about = None)]
struct Cli {
    /// Base URL of a running bridge.
    #[arg(short, long, default_value = "http://localhost:5000")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show service health and endpoint states
    Health,
    /// Show monitoring status and effective configuration
    Status,
    /// Start the monitoring loop if it is not running
    Start,
    /// Verify Jira credentials and project access from the environment
    CheckJira {
        /// Also create a test ticket and close it again
        #[arg(long)]
        create_test_ticket: bool,

        /// Workflow transition used to close the test ticket
        #[arg(long, default_value = "Close")]
        close_transition: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    match cli.command {
        Commands::Health => {
            let res = client.get(format!("{}/health", cli.url)).send().await?;
            print_response(res).await?;
        }
        Commands::Status => {
            let res = client
                .get(format!("{}/monitoring/status", cli.url))
                .send()
                .await?;
            print_response(res).await?;
        }
        Commands::Start => {
            let res = client
                .post(format!("{}/monitoring/start", cli.url))
                .send()
                .await?;
            print_response(res).await?;
        }
        Commands::CheckJira {
            create_test_ticket,
            close_transition,
        } => {
            if !check_jira(create_test_ticket, &close_transition).await? {
                std::process::exit(1);
            }
        }
    }

    Ok(())
}

async fn check_jira(
    create_test_ticket: bool,
    close_transition: &str,
) -> Result<bool, Box<dyn std::error::Error>> {
    let config = match config::load_config() {
        Ok(config) => config,
        Err(ConfigError::Validation(errors)) => {
            for error in errors {
                eprintln!("Configuration error: {}", error);
            }
            return Ok(false);
        }
        Err(e) => return Err(e.into()),
    };

    let jira = JiraClient::new(config.jira.clone(), config.tickets.clone())?;
    let project_key = config.jira.project_key.clone().unwrap_or_default();

    println!("Jira:       {}", config.jira.base_url().unwrap_or_default());
    println!("User:       {}", config.jira.username.as_deref().unwrap_or_default());
    println!("Project:    {}", project_key);
    println!("Issue type: {}", config.jira.issue_type);

    match jira.current_user().await {
        Ok(user) => println!("[ok] authenticated as {}", display_name(&user)),
        Err(e) => {
            eprintln!("[failed] authentication: {}", e);
            return Ok(false);
        }
    }

    match jira.project(&project_key).await {
        Ok(project) => println!("[ok] project accessible: {}", display_name(&project)),
        Err(e) => {
            eprintln!("[failed] project access: {}", e);
            return Ok(false);
        }
    }

    if !create_test_ticket {
        return Ok(true);
    }

    let payload = IssuePayload {
        fields: IssueFields {
            project: KeyRef { key: project_key },
            issuetype: NameRef {
                name: config.jira.issue_type.clone(),
            },
            summary: "[TEST] Webhook connection test".to_string(),
            description: "Created automatically to verify the bridge's Jira connection."
                .to_string(),
            priority: None,
            labels: Vec::new(),
            assignee: None,
            components: Vec::new(),
        },
    };

    let ticket = match jira.create_issue(&payload).await {
        Ok(ticket) => {
            println!("[ok] test ticket created: {} ({})", ticket.key, ticket.url);
            ticket
        }
        Err(e) => {
            eprintln!("[failed] ticket creation: {}", e);
            return Ok(false);
        }
    };

    match jira.transition_issue(&ticket.key, close_transition).await {
        Ok(()) => println!("[ok] test ticket closed"),
        Err(e) => println!("[warn] could not close test ticket: {}", e),
    }

    Ok(true)
}

fn display_name(value: &Value) -> &str {
    value
        .get("displayName")
        .or_else(|| value.get("name"))
        .and_then(Value::as_str)
        .unwrap_or("Unknown")
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: bridge returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        return Ok(());
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}

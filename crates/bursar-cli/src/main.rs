// Bursar CLI - operator tool for the Bursar billing server

use anyhow::{anyhow, Context};
use clap::{Parser, Subcommand};
use colored::Colorize;
use serde_json::{json, Value};
use uuid::Uuid;

/// Bursar - enrollment billing operator tool
#[derive(Parser)]
#[command(name = "bursar")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Base URL of the Bursar server
    #[arg(long, global = true, default_value = "http://localhost:3000")]
    server: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate the billing plan for an enrollment
    GenerateBilling {
        /// Enrollment id
        enrollment: Uuid,

        /// Acting operator id recorded on the ledger
        #[arg(long)]
        actor: Uuid,
    },
    /// Open a checkout for the next payment due on an enrollment
    Checkout {
        /// Enrollment id
        enrollment: Uuid,

        /// Acting operator id recorded on the ledger
        #[arg(long)]
        actor: Uuid,
    },
    /// Show the billing summary for an enrollment
    Billing {
        /// Enrollment id
        enrollment: Uuid,
    },
    /// Show a student's account balance and recent activity
    Account {
        /// Student id
        student: Uuid,
    },
    /// Complete a payment through the mock endpoint (offline mode)
    Complete {
        /// Payment id
        payment: Uuid,

        /// Payment method to record
        #[arg(long)]
        method: Option<String>,

        /// Gateway reference number to record
        #[arg(long)]
        reference: Option<String>,
    },
    /// Cancel a pending payment
    Cancel {
        /// Payment id
        payment: Uuid,
    },
}

fn main() {
    let cli = Cli::parse();
    let server = cli.server.clone();

    let result = match cli.command {
        Commands::GenerateBilling { enrollment, actor } => {
            handle_generate_billing(&server, enrollment, actor)
        }
        Commands::Checkout { enrollment, actor } => handle_checkout(&server, enrollment, actor),
        Commands::Billing { enrollment } => handle_billing(&server, enrollment),
        Commands::Account { student } => handle_account(&server, student),
        Commands::Complete {
            payment,
            method,
            reference,
        } => handle_complete(&server, payment, method, reference),
        Commands::Cancel { payment } => handle_cancel(&server, payment),
    };

    if let Err(e) = result {
        eprintln!("{} {}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

fn post(url: &str, body: Value) -> anyhow::Result<Value> {
    match ureq::post(url).send_json(body) {
        Ok(response) => response.into_json().context("Failed to parse response"),
        Err(ureq::Error::Status(code, response)) => {
            let detail = response.into_string().unwrap_or_default();
            Err(anyhow!("server returned {}: {}", code, detail))
        }
        Err(e) => Err(anyhow!("request failed: {}", e)),
    }
}

fn get(url: &str) -> anyhow::Result<Value> {
    match ureq::get(url).call() {
        Ok(response) => response.into_json().context("Failed to parse response"),
        Err(ureq::Error::Status(code, response)) => {
            let detail = response.into_string().unwrap_or_default();
            Err(anyhow!("server returned {}: {}", code, detail))
        }
        Err(e) => Err(anyhow!("request failed: {}", e)),
    }
}

fn handle_generate_billing(server: &str, enrollment: Uuid, actor: Uuid) -> anyhow::Result<()> {
    let plan = post(
        &format!("{}/api/v1/billing/generate-billing", server),
        json!({ "enrollmentId": enrollment, "createdBy": actor }),
    )?;

    println!("{}", "Billing generated".green().bold());
    println!("  Total:   {}", plan["totalAmount"].as_str().unwrap_or("-"));
    println!(
        "  Balance: {}",
        plan["accountBalance"].as_str().unwrap_or("-")
    );
    for fee in plan["fees"].as_array().into_iter().flatten() {
        println!(
            "  Fee:     {} ({})",
            fee["amount"].as_str().unwrap_or("-"),
            fee["description"].as_str().unwrap_or("-")
        );
    }
    for installment in plan["installments"].as_array().into_iter().flatten() {
        println!(
            "  #{:<2}      {} due {}",
            installment["installmentNumber"],
            installment["amount"].as_str().unwrap_or("-"),
            installment["dueDate"].as_str().unwrap_or("-")
        );
    }
    Ok(())
}

fn handle_checkout(server: &str, enrollment: Uuid, actor: Uuid) -> anyhow::Result<()> {
    let checkout = post(
        &format!("{}/api/v1/billing/create-checkout", server),
        json!({ "enrollmentId": enrollment, "createdBy": actor }),
    )?;

    println!("{}", "Checkout created".green().bold());
    println!(
        "  Payment:  {}",
        checkout["paymentId"].as_str().unwrap_or("-")
    );
    println!(
        "  Type:     {}",
        checkout["paymentType"].as_str().unwrap_or("-")
    );
    println!("  Amount:   {}", checkout["amount"].as_str().unwrap_or("-"));
    println!(
        "  Checkout: {}",
        checkout["checkoutUrl"].as_str().unwrap_or("-").cyan()
    );
    Ok(())
}

fn handle_billing(server: &str, enrollment: Uuid) -> anyhow::Result<()> {
    let summary = get(&format!("{}/api/v1/billing/{}", server, enrollment))?;

    println!("{}", format!("Enrollment {}", enrollment).bold());
    println!(
        "  Status:  {} / {}",
        summary["status"].as_str().unwrap_or("-"),
        summary["paymentStatus"].as_str().unwrap_or("-")
    );
    println!(
        "  Balance: {}",
        summary["accountBalance"].as_str().unwrap_or("-")
    );
    for fee in summary["fees"].as_array().into_iter().flatten() {
        let mark = if fee["isPaid"].as_bool().unwrap_or(false) {
            "paid".green()
        } else {
            "unpaid".yellow()
        };
        println!(
            "  Fee {} {} [{}]",
            fee["description"].as_str().unwrap_or("-"),
            fee["amount"].as_str().unwrap_or("-"),
            mark
        );
    }
    for installment in summary["installments"].as_array().into_iter().flatten() {
        println!(
            "  #{:<2} {} due {} [{}]",
            installment["installmentNumber"],
            installment["amount"].as_str().unwrap_or("-"),
            installment["dueDate"].as_str().unwrap_or("-"),
            installment["status"].as_str().unwrap_or("-")
        );
    }
    Ok(())
}

fn handle_account(server: &str, student: Uuid) -> anyhow::Result<()> {
    let account = get(&format!("{}/api/v1/billing/account/{}", server, student))?;

    println!("{}", format!("Student {}", student).bold());
    println!(
        "  Balance: {}",
        account["totalBalance"].as_str().unwrap_or("-")
    );
    for entry in account["recentTransactions"]
        .as_array()
        .into_iter()
        .flatten()
    {
        println!(
            "  {} {} ({} -> {})",
            entry["description"].as_str().unwrap_or("-"),
            entry["amount"].as_str().unwrap_or("-"),
            entry["balanceBefore"].as_str().unwrap_or("-"),
            entry["balanceAfter"].as_str().unwrap_or("-")
        );
    }
    Ok(())
}

fn handle_complete(
    server: &str,
    payment: Uuid,
    method: Option<String>,
    reference: Option<String>,
) -> anyhow::Result<()> {
    let result = post(
        &format!("{}/api/v1/billing/payment/mock/{}/complete", server, payment),
        json!({ "method": method, "referenceNumber": reference }),
    )?;

    if result["alreadyProcessed"].as_bool().unwrap_or(false) {
        println!("{}", "Payment was already processed".yellow());
    } else {
        println!("{}", "Payment completed".green().bold());
    }
    Ok(())
}

fn handle_cancel(server: &str, payment: Uuid) -> anyhow::Result<()> {
    post(
        &format!("{}/api/v1/billing/payment/{}/cancel", server, payment),
        json!({}),
    )?;
    println!("{}", "Payment cancelled".green().bold());
    Ok(())
}

use std::sync::Arc;

use anyhow::Result;
use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use client_core::{
    ApiClient, FetchState, ListController, ListRoute, Session, StaticSessionProvider,
};
use shared::domain::{
    totals_by_currency, ConsultantRecord, InvoiceRecord, InvoiceStatus, TimeLogId,
};
use shared::protocol::ListQuery;

mod config;

#[derive(Parser, Debug)]
#[command(name = "console", about = "Terminal front end for the workforce dashboard API")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Page through the company's invoices
    Invoices {
        #[arg(long, default_value_t = 1)]
        page: u64,
        #[arg(long, default_value_t = 10)]
        limit: u64,
        #[arg(long)]
        search: Option<String>,
        #[arg(long)]
        status: Option<String>,
        #[arg(long)]
        start_date: Option<NaiveDate>,
        #[arg(long)]
        end_date: Option<NaiveDate>,
    },
    /// Page through the company's consultants
    Consultants {
        #[arg(long, default_value_t = 1)]
        page: u64,
        #[arg(long, default_value_t = 10)]
        limit: u64,
        #[arg(long)]
        search: Option<String>,
        #[arg(long)]
        status: Option<String>,
        #[arg(long)]
        department: Option<String>,
    },
    /// Per-status invoice rollup
    Summary,
    /// Monthly revenue series with per-currency totals
    Monthly,
    /// Set an invoice's status
    MarkInvoice {
        #[arg(long)]
        id: String,
        #[arg(long, value_enum)]
        status: StatusArg,
    },
    /// Approve a batch of time logs
    Approve {
        #[arg(long = "id", required = true)]
        ids: Vec<String>,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum StatusArg {
    Draft,
    Pending,
    Paid,
    Overdue,
    Cancelled,
}

impl From<StatusArg> for InvoiceStatus {
    fn from(value: StatusArg) -> Self {
        match value {
            StatusArg::Draft => Self::Draft,
            StatusArg::Pending => Self::Pending,
            StatusArg::Paid => Self::Paid,
            StatusArg::Overdue => Self::Overdue,
            StatusArg::Cancelled => Self::Cancelled,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().init();
    let args = Args::parse();
    let settings = config::load_settings();

    let session = Session {
        user_id: settings.user_id.as_str().into(),
        role: settings.role,
        company_id: settings.company_id.clone().map(Into::into),
        auth_token: settings.auth_token.clone(),
    };
    let client = ApiClient::new(
        settings.api_url.clone(),
        Arc::new(StaticSessionProvider::new(session)),
    );

    match args.command {
        Command::Invoices {
            page,
            limit,
            search,
            status,
            start_date,
            end_date,
        } => {
            let mut query = ListQuery::new().with_page(page).with_limit(limit);
            if let Some(search) = search {
                query = query.with_search(search);
            }
            if let Some(status) = status {
                query = query.with_status(status);
            }
            if let (Some(start), Some(end)) = (start_date, end_date) {
                query = query.with_date_range(start, end);
            }
            let mut controller = ListController::<InvoiceRecord>::with_query(
                client,
                ListRoute::CompanyInvoices,
                query,
            );
            controller.refresh().await;
            render_invoices(&controller);
        }
        Command::Consultants {
            page,
            limit,
            search,
            status,
            department,
        } => {
            let mut query = ListQuery::new().with_page(page).with_limit(limit);
            if let Some(search) = search {
                query = query.with_search(search);
            }
            if let Some(status) = status {
                query = query.with_status(status);
            }
            if let Some(department) = department {
                query = query.with_department(department.into());
            }
            let mut controller = ListController::<ConsultantRecord>::with_query(
                client,
                ListRoute::CompanyConsultants,
                query,
            );
            controller.refresh().await;
            render_consultants(&controller);
        }
        Command::Summary => match client.invoice_summary().await {
            Ok(rows) => {
                for row in rows {
                    println!("{:<10} {:>5} {:>12.2}", row.status.as_str(), row.count, row.amount);
                }
            }
            Err(failure) => report_failure(failure.attempts, &failure.error.to_string()),
        },
        Command::Monthly => match client.monthly_revenue().await {
            Ok(points) => {
                for point in &points {
                    println!(
                        "{}-{:02} {} {:>12.2}",
                        point.year,
                        point.month,
                        point.currency.code(),
                        point.amount
                    );
                }
                for (currency, total) in totals_by_currency(&points) {
                    println!("total {} {:.2}", currency.code(), total);
                }
            }
            Err(failure) => report_failure(failure.attempts, &failure.error.to_string()),
        },
        Command::MarkInvoice { id, status } => {
            let status: InvoiceStatus = status.into();
            client
                .update_invoice_status(&id.as_str().into(), status)
                .await?;
            println!("invoice {id} marked {}", status.as_str());
        }
        Command::Approve { ids } => {
            let ids: Vec<TimeLogId> = ids.into_iter().map(Into::into).collect();
            client.approve_time_logs(&ids).await?;
            println!("approved {} time log(s)", ids.len());
        }
    }

    Ok(())
}

fn render_invoices(controller: &ListController<InvoiceRecord>) {
    match controller.state() {
        FetchState::Success { items, pagination } => {
            for invoice in items {
                println!(
                    "{:<10} {:<12} {:<24} {:>10.2} {} {}",
                    invoice.status.as_str(),
                    invoice.invoice_number,
                    invoice.client_name,
                    invoice.amount,
                    invoice.currency.code(),
                    invoice.issued_on
                );
            }
            println!(
                "page {}/{} ({} total)",
                pagination.page, pagination.total_pages, pagination.total
            );
        }
        FetchState::Error { message, attempts } => report_failure(*attempts, message),
        _ => {}
    }
}

fn render_consultants(controller: &ListController<ConsultantRecord>) {
    match controller.state() {
        FetchState::Success { items, pagination } => {
            for consultant in items {
                println!(
                    "{:<24} {:<28} {:<10}",
                    consultant.name,
                    consultant.email,
                    consultant.status.as_str()
                );
            }
            println!(
                "page {}/{} ({} total)",
                pagination.page, pagination.total_pages, pagination.total
            );
        }
        FetchState::Error { message, attempts } => report_failure(*attempts, message),
        _ => {}
    }
}

fn report_failure(attempts: u32, message: &str) {
    if attempts > 1 {
        eprintln!("request failed after {attempts} attempts: {message}");
    } else {
        eprintln!("request failed: {message}");
    }
}

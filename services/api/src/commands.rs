use crate::infra::{build_backend, parse_date};
use chrono::{NaiveDate, Utc};
use clap::{Args, ValueEnum};
use sembrador::config::AppConfig;
use sembrador::dashboard::{DashboardService, SortDirection, SortKey, SubscriberSort};
use sembrador::error::AppError;
use sembrador::export::{export_csv, FileDownloadTarget};
use sembrador::registration::{validate_registration, Field, RegistrationInput};
use sembrador::telemetry;
use std::path::PathBuf;

#[derive(Args, Debug, Default)]
pub(crate) struct ValidateArgs {
    /// Full name as typed in the form
    #[arg(long, default_value = "")]
    pub(crate) name: String,
    /// Email address to check
    #[arg(long, default_value = "")]
    pub(crate) email: String,
    /// Ten-digit phone number
    #[arg(long, default_value = "")]
    pub(crate) phone: String,
    /// Selected event id
    #[arg(long, default_value = "")]
    pub(crate) event_id: String,
    /// Mark the data-policy checkbox as accepted
    #[arg(long)]
    pub(crate) accepts_data_policy: bool,
    /// Print the per-field report as JSON
    #[arg(long)]
    pub(crate) json: bool,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub(crate) enum SortColumn {
    Name,
    Email,
    Phone,
    CreatedAt,
    Confirmed,
}

impl From<SortColumn> for SortKey {
    fn from(value: SortColumn) -> Self {
        match value {
            SortColumn::Name => SortKey::Name,
            SortColumn::Email => SortKey::Email,
            SortColumn::Phone => SortKey::Phone,
            SortColumn::CreatedAt => SortKey::CreatedAt,
            SortColumn::Confirmed => SortKey::Confirmed,
        }
    }
}

#[derive(Args, Debug)]
pub(crate) struct ExportArgs {
    /// Directory receiving the CSV files
    #[arg(long, default_value = ".")]
    pub(crate) out_dir: PathBuf,
    /// Export a single event (defaults to every event)
    #[arg(long)]
    pub(crate) event_id: Option<String>,
    /// Column used to order the rows (defaults to newest first)
    #[arg(long, value_enum)]
    pub(crate) sort: Option<SortColumn>,
    /// Sort descending instead of ascending
    #[arg(long)]
    pub(crate) descending: bool,
    /// Date stamped into the file name (YYYY-MM-DD, defaults to today in UTC)
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) date: Option<NaiveDate>,
}

impl ExportArgs {
    fn order(&self) -> SubscriberSort {
        let direction = if self.descending {
            SortDirection::Desc
        } else {
            SortDirection::Asc
        };
        SubscriberSort {
            sort: self.sort.map(SortKey::from),
            direction,
        }
    }
}

pub(crate) fn run_validate(args: ValidateArgs) -> Result<(), AppError> {
    let json = args.json;
    let input = RegistrationInput {
        name: args.name,
        email: args.email,
        phone: args.phone,
        event_id: args.event_id,
        accepts_data_policy: args.accepts_data_policy,
    };
    let report = validate_registration(&input);

    if json {
        let rendered = serde_json::to_string_pretty(&report.view())
            .map_err(|err| AppError::Io(err.into()))?;
        println!("{rendered}");
        return Ok(());
    }

    for field in Field::ordered() {
        let errors = report.errors_for(field);
        if errors.is_empty() {
            println!("{:<20} ok", field_label(field));
        } else {
            for error in errors {
                println!("{:<20} {}", field_label(field), error);
            }
        }
    }
    println!(
        "\n{}",
        if report.is_valid() {
            "Registration is ready to submit."
        } else {
            "Registration has fields to fix."
        }
    );
    Ok(())
}

fn field_label(field: Field) -> &'static str {
    match field {
        Field::Name => "name",
        Field::Email => "email",
        Field::Phone => "phone",
        Field::EventId => "event-id",
        Field::AcceptsDataPolicy => "accepts-data-policy",
    }
}

pub(crate) async fn run_export(args: ExportArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry)?;

    let backend = build_backend(&config)?;
    let service = DashboardService::new(backend);
    let order = args.order();
    let date = args.date.unwrap_or_else(|| Utc::now().date_naive());

    let exports = match &args.event_id {
        Some(event_id) => vec![service.export(event_id, order, date).await?],
        None => service.export_all(order, date).await?,
    };

    let target = FileDownloadTarget::new(&args.out_dir);
    for export in &exports {
        export_csv(&target, &export.filename, &export.headers, &export.rows)?;
        println!(
            "{} ({} inscritos)",
            target.directory().join(&export.filename).display(),
            export.rows.len()
        );
    }
    if exports.is_empty() {
        println!("No events to export.");
    }
    Ok(())
}

//! `bbank` - CLI for bloodbank
//!
//! This binary provides the command-line interface for donor registration,
//! the donation workflow, hospital requests and inventory.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use bloodbank::cli::{
    output, session_file, Cli, Command, ConfigCommand, DonorCommand, InventoryCommand,
    LoginCommand, OperatorCommand, RequestCommand, StatsCommand,
};
use bloodbank::forms::{
    BloodRequestForm, CollectionForm, Credentials, LoginForm, RegistrationForm, ScreeningForm,
};
use bloodbank::session::{register_operator, Role, SessionContext, SessionPolicy};
use bloodbank::storage::{current_timestamp, DonorQuery};
use bloodbank::{init_logging, intake, inventory, Config, DonorWorkflow, Error, Result, Storage};

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    init_logging(cli.verbosity());

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    // Config commands must work without a usable database.
    let command = match cli.command {
        Command::Config(cmd) => return handle_config(cli.config, cmd),
        other => other,
    };

    let config = Config::load_from(cli.config)?;
    let storage = Storage::open(config.database_path())?;
    let app = App { config, storage };

    match command {
        Command::Login(cmd) => app.login(cmd),
        Command::Logout => app.logout(),
        Command::Whoami => app.whoami(),
        Command::Operator(cmd) => app.operator(cmd),
        Command::Donor(cmd) => app.donor(cmd),
        Command::Request(cmd) => app.request(cmd),
        Command::Inventory(cmd) => app.inventory(cmd),
        Command::Stats(cmd) => app.stats(&cmd),
        Command::Config(_) => Ok(()),
    }
}

/// Loaded configuration plus the open database.
struct App {
    config: Config,
    storage: Storage,
}

impl App {
    fn policy(&self) -> SessionPolicy {
        SessionPolicy::from_config(&self.config)
    }

    /// Resume the stored session, forgetting the token if it is no longer valid.
    fn session(&self) -> Result<SessionContext> {
        let path = self.config.session_file();
        let token = session_file::read_token(&path)?.ok_or(Error::SessionMissing)?;
        match SessionContext::resume(&self.storage, &token, self.policy(), current_timestamp()) {
            Err(e @ (Error::SessionMissing | Error::SessionExpired)) => {
                session_file::clear_token(&path)?;
                Err(e)
            }
            other => other,
        }
    }

    fn optional_session(&self) -> Result<Option<SessionContext>> {
        match self.session() {
            Ok(session) => Ok(Some(session)),
            Err(Error::SessionMissing | Error::SessionExpired) => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn login(&self, cmd: LoginCommand) -> Result<()> {
        let credentials = LoginForm {
            username: cmd.username,
            password: cmd.password,
        }
        .validate()?;

        // Replace whatever session this terminal held before.
        if let Some(previous) = self.optional_session()? {
            previous.sign_out(&self.storage)?;
        }

        let session =
            SessionContext::sign_in(&self.storage, &credentials, self.policy(), current_timestamp())?;
        session_file::write_token(&self.config.session_file(), session.token())?;
        println!(
            "Signed in as {} ({}); session expires {}",
            session.username(),
            session.role(),
            session.expires_at().format("%Y-%m-%d %H:%M UTC")
        );
        Ok(())
    }

    fn logout(&self) -> Result<()> {
        match self.optional_session()? {
            Some(session) => {
                session.sign_out(&self.storage)?;
                session_file::clear_token(&self.config.session_file())?;
                println!("Signed out.");
            }
            None => println!("Not signed in."),
        }
        Ok(())
    }

    fn whoami(&self) -> Result<()> {
        let session = self.session()?;
        println!("Username:  {}", session.username());
        println!("Role:      {}", session.role());
        println!(
            "Expires:   {}",
            session.expires_at().format("%Y-%m-%d %H:%M UTC")
        );
        Ok(())
    }

    fn operator(&self, cmd: OperatorCommand) -> Result<()> {
        match cmd {
            OperatorCommand::Add {
                username,
                role,
                password,
            } => {
                let session = self.optional_session()?;
                let credentials = Credentials { username, password };
                let operator = register_operator(
                    &self.storage,
                    session.as_ref(),
                    &credentials,
                    role,
                    current_timestamp(),
                )?;
                println!(
                    "Created operator '{}' with role {}",
                    operator.username, operator.role
                );
            }
        }
        Ok(())
    }

    fn donor(&self, cmd: DonorCommand) -> Result<()> {
        let mut out = std::io::stdout().lock();
        match cmd {
            DonorCommand::Register(args) => {
                let form = RegistrationForm {
                    name: args.name,
                    age: args.age,
                    gender: args.gender,
                    blood_group: args.blood_group,
                    contact: args.contact,
                    email: args.email,
                    address: args.address,
                };
                let donor = intake::register_donor(&self.storage, &form, &self.config.validation)?;
                writeln!(
                    out,
                    "Registered donor #{} ({}, {})",
                    donor.id, donor.name, donor.blood_group
                )?;
            }
            DonorCommand::List {
                search,
                status,
                limit,
                format,
            } => {
                self.session()?.require_role(Role::Admin, "donor listing")?;
                let donors = self.storage.list_donors(&DonorQuery {
                    search,
                    status,
                    limit,
                })?;
                output::write_donors(&mut out, &donors, format)?;
            }
            DonorCommand::Show { id, format } => {
                self.session()?.require_role(Role::Admin, "donor details")?;
                let details = self.storage.donor_details(id)?;
                output::write_donor_details(&mut out, &details, format)?;
            }
            DonorCommand::CheckIn { id, yes } => {
                let session = self.session()?;
                let workflow = DonorWorkflow::new(&self.storage, &session)?;
                if yes {
                    let donor = workflow.check_in(id)?;
                    writeln!(out, "Donor #{} is now {}", donor.id, donor.status)?;
                } else {
                    writeln!(out, "This moves donor #{id} into the screening queue.")?;
                    writeln!(out, "Use --yes to confirm.")?;
                }
            }
            DonorCommand::Screen(args) => {
                let session = self.session()?;
                let workflow = DonorWorkflow::new(&self.storage, &session)?;
                let input = ScreeningForm {
                    blood_pressure: args.blood_pressure,
                    hemoglobin: args.hemoglobin,
                    weight: args.weight,
                    temperature: args.temperature,
                    pulse: args.pulse,
                    notes: args.notes,
                }
                .validate()?;
                let outcome = workflow.screen(args.id, &input)?;
                writeln!(
                    out,
                    "Screening for donor #{} recorded ({}); donor is now {}",
                    outcome.donor.id, outcome.record.result, outcome.donor.status
                )?;
            }
            DonorCommand::Collect {
                id,
                quantity,
                notes,
            } => {
                let session = self.session()?;
                let workflow = DonorWorkflow::new(&self.storage, &session)?;
                let input = CollectionForm {
                    quantity_ml: quantity.unwrap_or_default(),
                    notes,
                }
                .validate(&self.config.workflow)?;
                let outcome = workflow.collect(id, &input)?;
                writeln!(
                    out,
                    "Collected {} ml of {} from donor #{}; donor is now {}",
                    outcome.donation.quantity_ml,
                    outcome.donation.blood_group,
                    outcome.donor.id,
                    outcome.donor.status
                )?;
            }
            DonorCommand::SetStatus { id, status } => {
                let session = self.session()?;
                let donor = DonorWorkflow::new(&self.storage, &session)?.set_status(id, status)?;
                writeln!(out, "Donor #{} is now {}", donor.id, donor.status)?;
            }
        }
        Ok(())
    }

    fn request(&self, cmd: RequestCommand) -> Result<()> {
        let mut out = std::io::stdout().lock();
        match cmd {
            RequestCommand::Submit(args) => {
                let session = self.session()?;
                let form = BloodRequestForm {
                    hospital_name: args.hospital,
                    contact_person: args.contact_person,
                    phone: args.phone,
                    email: args.email,
                    blood_group: args.blood_group,
                    units: args.units,
                    urgency: args.urgency,
                    reason: args.reason,
                };
                let request =
                    intake::submit_request(&self.storage, &session, &form, &self.config.validation)?;
                writeln!(
                    out,
                    "Submitted request #{} for {} x {} ({})",
                    request.id, request.units_requested, request.blood_group, request.urgency
                )?;
            }
            RequestCommand::List {
                status,
                limit,
                format,
            } => {
                self.session()?.require_role(Role::Admin, "request listing")?;
                let requests = self.storage.list_requests(status, limit)?;
                output::write_requests(&mut out, &requests, format)?;
            }
            RequestCommand::Process { id, action } => {
                let session = self.session()?;
                let request = intake::process_request(&self.storage, &session, id, action.into())?;
                writeln!(out, "Request #{} is now {}", request.id, request.status)?;
            }
        }
        Ok(())
    }

    fn inventory(&self, cmd: InventoryCommand) -> Result<()> {
        let mut out = std::io::stdout().lock();
        match cmd {
            InventoryCommand::List { format } => {
                let report = inventory::inventory_report(&self.storage, &self.config.inventory)?;
                output::write_inventory(&mut out, &report, format)?;
            }
            InventoryCommand::Set { group, units } => {
                let session = self.session()?;
                let entry = inventory::set_inventory_units(&self.storage, &session, group, units)?;
                writeln!(
                    out,
                    "{} now has {} units",
                    entry.blood_group, entry.units_available
                )?;
            }
        }
        Ok(())
    }

    fn stats(&self, cmd: &StatsCommand) -> Result<()> {
        self.session()?
            .require_role(Role::Admin, "dashboard statistics")?;
        let stats = self.storage.dashboard_stats(current_timestamp())?;
        output::write_stats(&mut std::io::stdout().lock(), &stats, cmd.format)
    }
}

fn handle_config(config_path: Option<PathBuf>, cmd: ConfigCommand) -> Result<()> {
    match cmd {
        ConfigCommand::Show { json } => {
            let config = Config::load_from(config_path)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&config)?);
            } else {
                println!("Current Configuration");
                println!("=====================");
                println!();
                println!("[Storage]");
                println!("  Database path:      {}", config.database_path().display());
                println!("  Session file:       {}", config.session_file().display());
                println!();
                println!("[Session]");
                println!("  TTL (minutes):      {}", config.session.ttl_minutes);
                println!(
                    "  Refresh (minutes):  {}",
                    config.session.refresh_window_minutes
                );
                println!();
                println!("[Validation]");
                println!(
                    "  Donor age:          {}-{}",
                    config.validation.min_donor_age, config.validation.max_donor_age
                );
                println!(
                    "  Request units:      {}-{}",
                    config.validation.min_request_units, config.validation.max_request_units
                );
                println!();
                println!("[Workflow]");
                println!(
                    "  Default quantity:   {} ml",
                    config.workflow.default_quantity_ml
                );
                println!();
                println!("[Inventory]");
                println!("  Alert below:        {}%", config.inventory.alert_percent);
            }
        }
        ConfigCommand::Path => {
            println!(
                "{}",
                config_path
                    .unwrap_or_else(Config::default_config_path)
                    .display()
            );
        }
        ConfigCommand::Validate { file } => {
            let path = file
                .or(config_path)
                .unwrap_or_else(Config::default_config_path);
            println!("Validating configuration: {}", path.display());
            Config::validate_file(&path)?;
            println!("Configuration is valid.");
        }
    }
    Ok(())
}

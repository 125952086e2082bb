//! `fst wo` command - Work order scheduling, execution, and evidence

use clap::Subcommand;
use console::style;
use dialoguer::Confirm;
use miette::{IntoDiagnostic, Result};

use crate::cli::helpers::{
    format_short_id, open_store, parse_date, resolve_client_id, resolve_work_order,
    transition_ctx, truncate_str,
};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::changelog::{ChangeLogEntry, EntityKind};
use crate::core::identity::EntityPrefix;
use crate::core::loader;
use crate::core::store::{Store, WriteBatch};
use crate::core::workorder_flow;
use crate::entities::technician::Technician;
use crate::entities::work_order::{
    MaterialUsage, TechnicianAssignment, WorkOrder, WorkOrderStatus,
};

#[derive(Subcommand, Debug)]
pub enum WoCommands {
    /// Create a standalone work order (not converted from a quote)
    New(NewArgs),

    /// Put a draft order on the calendar
    Schedule(ScheduleArgs),

    /// Mark the crew as on site
    Start(RefArgs),

    /// Complete the order (requires the full evidence bundle)
    Complete(RefArgs),

    /// Cancel the order with a reason
    Cancel(CancelArgs),

    /// Pause an in-progress order
    Hold(RefArgs),

    /// Resume a paused order
    Resume(RefArgs),

    /// Reopen a completed or cancelled order back to scheduled
    Reopen(ReopenArgs),

    /// Assign a technician to the crew
    Assign(AssignArgs),

    /// Remove a technician from the crew
    Unassign(UnassignArgs),

    /// Record material used on the job
    Material(MaterialArgs),

    /// Attach a photo to the evidence bundle
    Photo(PhotoArgs),

    /// Capture the client signature
    Sign(SignArgs),

    /// Update fields on the order
    Set(SetArgs),

    /// Show a work order's details
    Show(RefArgs),

    /// List work orders with filtering
    List(ListArgs),
}

#[derive(clap::Args, Debug)]
pub struct NewArgs {
    /// Work order title
    pub title: String,

    /// Client (name fragment or CLT id)
    #[arg(long, short = 'c')]
    pub client: Option<String>,

    /// Point of contact at the site
    #[arg(long)]
    pub poc: Option<String>,
}

#[derive(clap::Args, Debug)]
pub struct RefArgs {
    /// Work order number or ID
    pub wo: String,
}

#[derive(clap::Args, Debug)]
pub struct ScheduleArgs {
    /// Work order number or ID
    pub wo: String,

    /// Service date (YYYY-MM-DD)
    pub date: String,
}

#[derive(clap::Args, Debug)]
pub struct CancelArgs {
    /// Work order number or ID
    pub wo: String,

    /// Why the order is being cancelled
    #[arg(long, short = 'r')]
    pub reason: String,
}

#[derive(clap::Args, Debug)]
pub struct ReopenArgs {
    /// Work order number or ID
    pub wo: String,

    /// Also wipe the collected evidence bundle
    #[arg(long)]
    pub clear_evidence: bool,
}

#[derive(clap::Args, Debug)]
pub struct AssignArgs {
    /// Work order number or ID
    pub wo: String,

    /// Technician (name fragment or TECH id)
    pub tech: String,

    /// Role on this job (lead, helper, ...)
    #[arg(long)]
    pub role: Option<String>,
}

#[derive(clap::Args, Debug)]
pub struct UnassignArgs {
    /// Work order number or ID
    pub wo: String,

    /// Technician (name fragment or TECH id)
    pub tech: String,
}

#[derive(clap::Args, Debug)]
pub struct MaterialArgs {
    /// Work order number or ID
    pub wo: String,

    /// Material description
    #[arg(long, short = 'd')]
    pub description: String,

    /// Quantity used
    #[arg(long, short = 'n')]
    pub qty: f64,
}

#[derive(clap::Args, Debug)]
pub struct PhotoArgs {
    /// Work order number or ID
    pub wo: String,

    /// Photo URL or path
    pub url: String,

    /// Record as an after photo (default: before)
    #[arg(long)]
    pub after: bool,
}

#[derive(clap::Args, Debug)]
pub struct SignArgs {
    /// Work order number or ID
    pub wo: String,

    /// Signature image URL or path
    pub signature: String,

    /// Name of the person signing
    #[arg(long)]
    pub name: String,
}

#[derive(clap::Args, Debug)]
pub struct SetArgs {
    /// Work order number or ID
    pub wo: String,

    /// New title
    #[arg(long)]
    pub title: Option<String>,

    /// New point of contact
    #[arg(long)]
    pub poc: Option<String>,

    /// New service date (YYYY-MM-DD)
    #[arg(long)]
    pub date: Option<String>,

    /// Technician notes
    #[arg(long)]
    pub notes: Option<String>,
}

#[derive(clap::Args, Debug)]
pub struct ListArgs {
    /// Filter by status
    #[arg(long, short = 's')]
    pub status: Option<WorkOrderStatus>,

    /// Search in title
    #[arg(long)]
    pub search: Option<String>,

    /// Limit number of results
    #[arg(long, short = 'n')]
    pub limit: Option<usize>,
}

pub fn run(cmd: WoCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        WoCommands::New(args) => run_new(args, global),
        WoCommands::Schedule(args) => run_schedule(args, global),
        WoCommands::Start(args) => run_start(args, global),
        WoCommands::Complete(args) => run_complete(args, global),
        WoCommands::Cancel(args) => run_cancel(args, global),
        WoCommands::Hold(args) => run_hold(args, global),
        WoCommands::Resume(args) => run_resume(args, global),
        WoCommands::Reopen(args) => run_reopen(args, global),
        WoCommands::Assign(args) => run_assign(args, global),
        WoCommands::Unassign(args) => run_unassign(args, global),
        WoCommands::Material(args) => run_material(args, global),
        WoCommands::Photo(args) => run_photo(args, global),
        WoCommands::Sign(args) => run_sign(args, global),
        WoCommands::Set(args) => run_set(args, global),
        WoCommands::Show(args) => run_show(args, global),
        WoCommands::List(args) => run_list(args, global),
    }
}

/// Apply a lifecycle outcome and print the status move
fn commit(
    outcome: workorder_flow::WorkOrderOutcome,
    from: WorkOrderStatus,
    number: &str,
    global: &GlobalOpts,
) -> Result<()> {
    let mut store = open_store(global)?;
    let to = outcome.work_order.status;
    store
        .apply(outcome.into_batch())
        .map_err(|e| miette::miette!("{}", e))?;

    if !global.quiet {
        if from == to {
            println!("{} Updated {}", style("✓").green(), style(number).yellow());
        } else {
            println!(
                "{} {} {} → {}",
                style("✓").green(),
                style(number).yellow(),
                from,
                style(to).cyan()
            );
        }
    }
    Ok(())
}

fn run_new(args: NewArgs, global: &GlobalOpts) -> Result<()> {
    use chrono::Datelike;

    let mut store = open_store(global)?;
    let ctx = transition_ctx(global);

    let number = store
        .workspace()
        .next_wo_number(ctx.today().year())
        .map_err(|e| miette::miette!("{}", e))?;

    let mut wo = WorkOrder::new(&number, &args.title, &ctx.actor);
    wo.created = ctx.now;
    if let Some(ref client_ref) = args.client {
        wo.client = Some(resolve_client_id(store.workspace(), client_ref)?);
    }
    wo.poc = args.poc;

    let entry = ChangeLogEntry::created(
        EntityKind::WorkOrder,
        &wo.id.to_string(),
        &ctx.actor,
        ctx.now,
    );
    let batch = WriteBatch::new().with_work_order(wo.clone()).with_log(vec![entry]);
    store.apply(batch).map_err(|e| miette::miette!("{}", e))?;

    if !global.quiet {
        println!(
            "{} Created work order {} ({})",
            style("✓").green(),
            style(&number).yellow(),
            style(format_short_id(&wo.id)).cyan()
        );
    }
    Ok(())
}

fn run_schedule(args: ScheduleArgs, global: &GlobalOpts) -> Result<()> {
    let store = open_store(global)?;
    let ctx = transition_ctx(global);
    let wo = resolve_work_order(store.workspace(), &args.wo)?;
    let date = parse_date(&args.date)?;

    let outcome =
        workorder_flow::schedule(&wo, date, &ctx).map_err(|e| miette::miette!("{}", e))?;
    commit(outcome, wo.status, &wo.wo_number, global)
}

fn run_start(args: RefArgs, global: &GlobalOpts) -> Result<()> {
    let store = open_store(global)?;
    let ctx = transition_ctx(global);
    let wo = resolve_work_order(store.workspace(), &args.wo)?;

    let outcome = workorder_flow::start(&wo, &ctx).map_err(|e| miette::miette!("{}", e))?;
    commit(outcome, wo.status, &wo.wo_number, global)
}

fn run_complete(args: RefArgs, global: &GlobalOpts) -> Result<()> {
    let store = open_store(global)?;
    let ctx = transition_ctx(global);
    let wo = resolve_work_order(store.workspace(), &args.wo)?;

    let outcome = workorder_flow::complete(&wo, &ctx).map_err(|e| miette::miette!("{}", e))?;
    commit(outcome, wo.status, &wo.wo_number, global)
}

fn run_cancel(args: CancelArgs, global: &GlobalOpts) -> Result<()> {
    let store = open_store(global)?;
    let ctx = transition_ctx(global);
    let wo = resolve_work_order(store.workspace(), &args.wo)?;

    let outcome = workorder_flow::cancel(&wo, &args.reason, &ctx)
        .map_err(|e| miette::miette!("{}", e))?;
    commit(outcome, wo.status, &wo.wo_number, global)
}

fn run_hold(args: RefArgs, global: &GlobalOpts) -> Result<()> {
    let store = open_store(global)?;
    let ctx = transition_ctx(global);
    let wo = resolve_work_order(store.workspace(), &args.wo)?;

    let outcome = workorder_flow::hold(&wo, &ctx).map_err(|e| miette::miette!("{}", e))?;
    commit(outcome, wo.status, &wo.wo_number, global)
}

fn run_resume(args: RefArgs, global: &GlobalOpts) -> Result<()> {
    let store = open_store(global)?;
    let ctx = transition_ctx(global);
    let wo = resolve_work_order(store.workspace(), &args.wo)?;

    let outcome = workorder_flow::resume(&wo, &ctx).map_err(|e| miette::miette!("{}", e))?;
    commit(outcome, wo.status, &wo.wo_number, global)
}

fn run_reopen(args: ReopenArgs, global: &GlobalOpts) -> Result<()> {
    let store = open_store(global)?;
    let ctx = transition_ctx(global);
    let wo = resolve_work_order(store.workspace(), &args.wo)?;

    if args.clear_evidence && !global.yes {
        let confirmed = Confirm::new()
            .with_prompt(format!(
                "Wipe the collected evidence on {}? This cannot be undone",
                wo.wo_number
            ))
            .default(false)
            .interact()
            .into_diagnostic()?;
        if !confirmed {
            println!("Aborted.");
            return Ok(());
        }
    }

    let outcome = workorder_flow::reopen(&wo, args.clear_evidence, &ctx)
        .map_err(|e| miette::miette!("{}", e))?;
    commit(outcome, wo.status, &wo.wo_number, global)
}

fn resolve_technician(
    ws: &crate::core::Workspace,
    reference: &str,
) -> Result<Technician> {
    let dir = ws.entity_dir(EntityPrefix::Tech);
    if let Some((_, tech)) = loader::load_entity::<Technician>(&dir, reference)? {
        return Ok(tech);
    }
    let needle = reference.to_lowercase();
    loader::load_all::<Technician>(&dir)?
        .into_iter()
        .find(|t| t.name.to_lowercase().contains(&needle))
        .ok_or_else(|| miette::miette!("No technician found matching '{}'", reference))
}

fn run_assign(args: AssignArgs, global: &GlobalOpts) -> Result<()> {
    let store = open_store(global)?;
    let ctx = transition_ctx(global);
    let wo = resolve_work_order(store.workspace(), &args.wo)?;
    let tech = resolve_technician(store.workspace(), &args.tech)?;

    let assignment = TechnicianAssignment {
        technician: tech.id,
        name: tech.name.clone(),
        role: args.role,
    };

    let outcome = workorder_flow::assign_technician(&wo, assignment, &ctx)
        .map_err(|e| miette::miette!("{}", e))?;
    commit(outcome, wo.status, &wo.wo_number, global)?;

    if !global.quiet {
        println!("   Assigned {}", style(&tech.name).yellow());
    }
    Ok(())
}

fn run_unassign(args: UnassignArgs, global: &GlobalOpts) -> Result<()> {
    let store = open_store(global)?;
    let ctx = transition_ctx(global);
    let wo = resolve_work_order(store.workspace(), &args.wo)?;
    let tech = resolve_technician(store.workspace(), &args.tech)?;

    let outcome = workorder_flow::remove_technician(&wo, &tech.id, &ctx)
        .map_err(|e| miette::miette!("{}", e))?;
    commit(outcome, wo.status, &wo.wo_number, global)?;

    if !global.quiet {
        println!("   Removed {}", style(&tech.name).yellow());
    }
    Ok(())
}

fn run_material(args: MaterialArgs, global: &GlobalOpts) -> Result<()> {
    let store = open_store(global)?;
    let ctx = transition_ctx(global);
    let wo = resolve_work_order(store.workspace(), &args.wo)?;

    let usage = MaterialUsage {
        material: None,
        description: args.description,
        quantity: args.qty,
    };

    let outcome = workorder_flow::record_material(&wo, usage, &ctx)
        .map_err(|e| miette::miette!("{}", e))?;
    commit(outcome, wo.status, &wo.wo_number, global)
}

fn run_photo(args: PhotoArgs, global: &GlobalOpts) -> Result<()> {
    let store = open_store(global)?;
    let ctx = transition_ctx(global);
    let wo = resolve_work_order(store.workspace(), &args.wo)?;

    let outcome = workorder_flow::add_photo(&wo, args.url, args.after, &ctx)
        .map_err(|e| miette::miette!("{}", e))?;
    commit(outcome, wo.status, &wo.wo_number, global)
}

fn run_sign(args: SignArgs, global: &GlobalOpts) -> Result<()> {
    let store = open_store(global)?;
    let ctx = transition_ctx(global);
    let wo = resolve_work_order(store.workspace(), &args.wo)?;

    let outcome = workorder_flow::capture_signature(&wo, args.signature, args.name, &ctx)
        .map_err(|e| miette::miette!("{}", e))?;
    commit(outcome, wo.status, &wo.wo_number, global)
}

fn run_set(args: SetArgs, global: &GlobalOpts) -> Result<()> {
    let store = open_store(global)?;
    let ctx = transition_ctx(global);
    let wo = resolve_work_order(store.workspace(), &args.wo)?;

    let patch = workorder_flow::WorkOrderPatch {
        title: args.title,
        poc: args.poc,
        scheduled_date: match args.date {
            Some(ref date) => Some(parse_date(date)?),
            None => None,
        },
        technician_notes: args.notes,
    };

    let outcome = workorder_flow::update_fields(&wo, patch, &ctx)
        .map_err(|e| miette::miette!("{}", e))?;
    commit(outcome, wo.status, &wo.wo_number, global)
}

fn run_show(args: RefArgs, global: &GlobalOpts) -> Result<()> {
    let store = open_store(global)?;
    let wo = resolve_work_order(store.workspace(), &args.wo)?;

    match global.format {
        OutputFormat::Yaml => {
            let yaml = serde_yml::to_string(&wo).into_diagnostic()?;
            print!("{}", yaml);
        }
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&wo).into_diagnostic()?;
            println!("{}", json);
        }
        OutputFormat::Id => println!("{}", wo.id),
        _ => {
            println!("{}", style("─".repeat(60)).dim());
            println!(
                "{}: {} ({})",
                style("Work order").bold(),
                style(&wo.wo_number).yellow(),
                style(&wo.id.to_string()).cyan()
            );
            println!("{}: {}", style("Title").bold(), wo.title);
            println!("{}: {}", style("Status").bold(), style(wo.status).cyan());
            if let Some(ref date) = wo.scheduled_date {
                println!("{}: {}", style("Scheduled").bold(), date);
            }
            if let Some(ref reason) = wo.cancel_reason {
                println!("{}: {}", style("Cancelled").bold(), reason);
            }
            println!("{}", style("─".repeat(60)).dim());

            if !wo.technicians.is_empty() {
                println!("{}", style("Crew:").bold());
                for tech in &wo.technicians {
                    println!("  {}", tech.describe());
                }
            }
            if !wo.materials.is_empty() {
                println!("{}", style("Materials:").bold());
                for usage in &wo.materials {
                    println!("  {}", usage.describe());
                }
            }

            println!("{}", style("Evidence:").bold());
            println!(
                "  before photos: {} | after photos: {} | signature: {}",
                wo.evidence.photos_before.len(),
                wo.evidence.photos_after.len(),
                wo.evidence
                    .client_signature_name
                    .as_deref()
                    .unwrap_or("(missing)")
            );
            let missing = workorder_flow::missing_evidence(&wo);
            if !missing.is_empty() && wo.status != WorkOrderStatus::Completed {
                let names: Vec<String> = missing.iter().map(|m| m.to_string()).collect();
                println!(
                    "  {} missing for completion: {}",
                    style("!").yellow(),
                    style(names.join(", ")).yellow()
                );
            }

            println!("{}", style("─".repeat(60)).dim());
            println!(
                "{}: {} | {}: {} | {}: {}",
                style("Author").dim(),
                wo.author,
                style("Created").dim(),
                wo.created.format("%Y-%m-%d %H:%M"),
                style("Revision").dim(),
                wo.entity_revision
            );
        }
    }
    Ok(())
}

fn run_list(args: ListArgs, global: &GlobalOpts) -> Result<()> {
    let store = open_store(global)?;
    let mut orders: Vec<WorkOrder> =
        loader::load_all(&store.workspace().entity_dir(EntityPrefix::Wo))?;

    if let Some(status) = args.status {
        orders.retain(|w| w.status == status);
    }
    if let Some(ref search) = args.search {
        let needle = search.to_lowercase();
        orders.retain(|w| w.title.to_lowercase().contains(&needle));
    }
    orders.sort_by(|a, b| a.wo_number.cmp(&b.wo_number));
    if let Some(limit) = args.limit {
        orders.truncate(limit);
    }

    if orders.is_empty() {
        println!("No work orders found.");
        return Ok(());
    }

    let format = match global.format {
        OutputFormat::Auto => OutputFormat::Tsv,
        f => f,
    };

    match format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&orders).into_diagnostic()?;
            println!("{}", json);
        }
        OutputFormat::Yaml => {
            let yaml = serde_yml::to_string(&orders).into_diagnostic()?;
            print!("{}", yaml);
        }
        OutputFormat::Id => {
            for wo in &orders {
                println!("{}", wo.id);
            }
        }
        _ => {
            println!(
                "{:<14} {:<28} {:<12} {:<12}",
                style("NUMBER").bold(),
                style("TITLE").bold(),
                style("STATUS").bold(),
                style("DATE").bold()
            );
            println!("{}", "-".repeat(70));
            for wo in &orders {
                let date = wo
                    .scheduled_date
                    .map(|d| d.to_string())
                    .unwrap_or_else(|| "-".to_string());
                println!(
                    "{:<14} {:<28} {:<12} {:<12}",
                    style(&wo.wo_number).cyan(),
                    truncate_str(&wo.title, 26),
                    wo.status,
                    date
                );
            }
            println!();
            println!("{} work order(s) found.", style(orders.len()).cyan());
        }
    }
    Ok(())
}

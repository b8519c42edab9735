use std::io::Write;

use anyhow::Context;
use colored::*;
use seedplan_cli::commands::{parse_line, ChatCommand, ChatInput, HELP_TEXT};
use seedplan_cli::display;
use seedplan_config::PlannerConfig;
use seedplan_planner::{
    BusinessPlan, ExportOptions, Language, PlannerSession, RatingEffect, RefineOutcome,
    SubmitOutcome, PLAN_READY_MESSAGE, RATING_REQUEST_MESSAGE, REFINE_CONFIRMATION_MESSAGE,
    REFINE_FAILURE_MESSAGE,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;

pub async fn run(language: Option<String>) -> anyhow::Result<()> {
    let config = PlannerConfig::from_env().context("Invalid configuration")?;
    let session =
        PlannerSession::from_config(&config).context("Could not start a planning session")?;
    if let Some(tag) = language {
        let language: Language = tag.parse().map_err(anyhow::Error::msg)?;
        session.set_language(language).await;
    }
    let export_options = ExportOptions::from_config(&config);

    println!("{}", "🌱 Seedplan".green().bold());
    println!(
        "{}",
        "Describe your business idea and where you want to start it. Type :help for commands."
            .dimmed()
    );
    info!(language = %session.language().await, "Chat started");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        prompt();
        let Some(line) = lines.next_line().await? else {
            break;
        };

        match parse_line(&line) {
            ChatInput::Empty => {}
            ChatInput::Invalid(message) => display::warning(&message),
            ChatInput::Text(text) => converse(&session, &text).await,
            ChatInput::Command(ChatCommand::Quit) => break,
            ChatInput::Command(command) => {
                if let Err(e) = run_command(&session, command, &export_options).await {
                    display::warning(&format!("{:#}", e));
                }
            }
        }
    }

    println!("{}", "Goodbye!".dimmed());
    Ok(())
}

fn prompt() {
    print!("{} ", ">".cyan().bold());
    std::io::stdout().flush().ok();
}

async fn completion(session: &PlannerSession, plan: &BusinessPlan) -> Vec<bool> {
    let mut completed = Vec::with_capacity(plan.setup_checklist.len());
    for idx in 0..plan.setup_checklist.len() {
        completed.push(session.is_step_complete(idx).await);
    }
    completed
}

async fn show_plan(session: &PlannerSession, plan: &BusinessPlan) {
    let completed = completion(session, plan).await;
    display::plan(plan, &completed);
}

/// Before a plan exists text feeds the pipeline, afterwards it refines the plan
async fn converse(session: &PlannerSession, text: &str) {
    if session.has_plan().await {
        println!("{}", "Updating your plan...".dimmed());
        match session.refine(text).await {
            Ok(RefineOutcome::Updated(plan)) => {
                display::assistant(REFINE_CONFIRMATION_MESSAGE);
                show_plan(session, &plan).await;
                display::assistant(RATING_REQUEST_MESSAGE);
            }
            Ok(RefineOutcome::Failed(_)) => display::assistant(REFINE_FAILURE_MESSAGE),
            Ok(RefineOutcome::Discarded) => {}
            Err(e) => display::warning(&e.to_string()),
        }
        return;
    }

    println!("{}", "Thinking...".dimmed());
    match session.submit(text).await {
        Ok(SubmitOutcome::Clarification(question)) => display::assistant(&question),
        Ok(SubmitOutcome::PlanReady(plan)) => {
            show_plan(session, &plan).await;
            display::assistant(PLAN_READY_MESSAGE);
        }
        Ok(SubmitOutcome::Failed(e)) => display::assistant(e.user_message()),
        Ok(SubmitOutcome::Discarded) => {}
        Err(e) => display::warning(&e.to_string()),
    }
}

async fn run_command(
    session: &PlannerSession,
    command: ChatCommand,
    export_options: &ExportOptions,
) -> anyhow::Result<()> {
    match command {
        ChatCommand::Verify(index) => {
            println!("{}", "Checking current requirements...".dimmed());
            let detail = session.verify(index).await?;
            display::legal_detail(index, &detail);
        }
        ChatCommand::Script(context) => {
            let script = session.generate_script(&context, None).await?;
            display::script(&script);
        }
        ChatCommand::Places(category) => {
            let places = session.find_nearby_places(&category).await?;
            display::places(&category, &places);
        }
        ChatCommand::Rate(rating) => match session.rate_latest(rating).await? {
            RatingEffect::Recorded => println!("{}", "Thanks for the feedback!".green()),
            RatingEffect::SuggestAdjustment(prefill) => {
                println!("{}", "Sorry about that. Tell me what to change, for example:".yellow());
                println!("  {}", prefill.italic());
            }
        },
        ChatCommand::Done(index) => {
            let done = session.toggle_step(index).await?;
            let total = session.plan().await.map(|p| p.setup_checklist.len()).unwrap_or(0);
            let state = if done { "done".green() } else { "not done".yellow() };
            println!(
                "Step {} marked {} ({}/{} complete)",
                index + 1,
                state,
                session.completed_steps().await,
                total
            );
        }
        ChatCommand::BreakEven => {
            let calculator = session.break_even_calculator().await?;
            let rows = session.cash_flow().await?;
            display::break_even(&calculator, &rows);
        }
        ChatCommand::Export(path) => {
            let document = session.export(export_options).await?;
            tokio::fs::write(&path, document.to_markdown())
                .await
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!(
                "{} {} ({} pages)",
                "Exported to".green(),
                path.display(),
                document.page_count()
            );
        }
        ChatCommand::Language(language) => {
            session.set_language(language).await;
            println!("Language set to {}", language.display_name().bold());
        }
        ChatCommand::Plan => match session.plan().await {
            Some(plan) => show_plan(session, &plan).await,
            None => display::warning("No plan yet. Describe your idea first."),
        },
        ChatCommand::Reset => {
            session.reset().await;
            println!("{}", "Started over. What would you like to build?".green());
        }
        ChatCommand::Help => println!("{}", HELP_TEXT),
        ChatCommand::Quit => {}
    }
    Ok(())
}

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use services::{MIN_TICK, ProgressEngine, TrainingTimer};
use tokio::sync::Mutex;
use tracing::info;
use training_core::catalog::QuestionBank;
use training_core::metrics::ModuleStatus;
use training_core::model::{Achievement, AchievementId, RiskAssessmentEntry};

use crate::cli::{Command, parse_answers};

pub async fn execute(mut engine: ProgressEngine, command: Command) -> Result<()> {
    match command {
        Command::Status => print_status(&engine),
        Command::Modules => print_modules(&engine),
        Command::Complete { module, minutes } => {
            let Some(module_id) = engine.catalog().resolve(&module) else {
                bail!("unknown module: {module}");
            };
            let outcome = engine.complete_module(module_id, minutes).await;
            let name = engine
                .catalog()
                .get(module_id)
                .map_or_else(|| format!("Module {module_id}"), |m| m.title.to_string());
            if outcome.newly_completed {
                println!("{name} completed.");
            } else {
                println!("{name} was already completed.");
            }
            if !outcome.known {
                println!(
                    "Module {module_id} is not in the catalog; it does not count toward progress."
                );
            }
            if let Some(next) = outcome.unlocked_next.and_then(|id| engine.catalog().get(id)) {
                println!("Unlocked: {}. {}", next.id, next.title);
            }
            print_unlocks(&outcome.new_achievements, outcome.certificate_awarded);
        }
        Command::Quiz {
            score,
            total,
            answers,
        } => {
            let bank = QuestionBank::default();
            let outcome = match (score, total, answers) {
                (Some(score), Some(total), _) => engine.submit_quiz(score, total).await?,
                (_, _, Some(raw)) => {
                    let answers = parse_answers(&raw)?;
                    let sheet = engine.submit_quiz_answers(&bank, &answers).await?;
                    for review in &sheet.graded.review {
                        let mark = if review.is_correct { "ok" } else { "x" };
                        println!(
                            "  Q{:<2} {mark:<2} correct answer: {}",
                            review.index + 1,
                            review.correct_option + 1
                        );
                    }
                    sheet.outcome
                }
                _ => {
                    print_questions(&bank);
                    return Ok(());
                }
            };
            println!(
                "Score: {}/{} ({}%), {}",
                outcome.attempt.score(),
                outcome.attempt.total_questions(),
                outcome.percentage,
                if outcome.passed { "passed" } else { "not passed" }
            );
            println!("{}", outcome.band.message());
            print_unlocks(&outcome.new_achievements, outcome.certificate_awarded);
        }
        Command::Assess {
            asset,
            threat,
            likelihood,
            impact,
        } => {
            let outcome = engine
                .submit_risk_assessment(&asset, &threat, likelihood, impact)
                .await?;
            print_entry(&outcome.entry);
            println!("{}", outcome.recommendation.headline);
            for action in outcome.recommendation.actions {
                println!("  - {action}");
            }
            print_unlocks(&outcome.new_achievements, outcome.certificate_awarded);
        }
        Command::History => {
            if engine.history().is_empty() {
                println!("No risk assessments yet.");
            }
            for entry in engine.history().iter() {
                print_entry(entry);
            }
        }
        Command::Achievements => print_achievements(&engine),
        Command::Export { out } => {
            let json = engine.export_json()?;
            match out {
                Some(path) => {
                    std::fs::write(&path, json)
                        .with_context(|| format!("writing {}", path.display()))?;
                    println!("Progress exported to {}", path.display());
                }
                None => println!("{json}"),
            }
        }
        Command::Reset { yes } => {
            if !yes {
                bail!("reset deletes all progress; pass --yes to confirm");
            }
            engine.reset_progress().await;
            println!("Progress reset.");
        }
        Command::Train { minutes, tick_secs } => {
            train(engine, minutes, Duration::from_secs(tick_secs).max(MIN_TICK)).await?;
        }
    }
    Ok(())
}

async fn train(engine: ProgressEngine, minutes: u32, tick: Duration) -> Result<()> {
    let start = engine.record().total_time_spent_minutes();
    let engine = Arc::new(Mutex::new(engine));
    let mut timer = TrainingTimer::start(Arc::clone(&engine), tick);
    info!(minutes, "training session started");
    println!("Training for {minutes} minute(s); press Ctrl-C to stop early.");

    let target = start + u64::from(minutes);
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            () = tokio::time::sleep(tick / 4) => {
                if engine.lock().await.record().total_time_spent_minutes() >= target {
                    break;
                }
            }
        }
    }
    timer.stop();

    let engine = engine.lock().await;
    let total = engine.record().total_time_spent_minutes();
    println!(
        "Recorded {} minute(s); total training time {total} min.",
        total.saturating_sub(start)
    );
    Ok(())
}

fn print_status(engine: &ProgressEngine) {
    let metrics = engine.metrics();
    let record = engine.record();
    println!(
        "Modules:      {}/{} ({}%)",
        metrics.modules_completed, metrics.module_count, metrics.completion_percentage
    );
    match metrics.best_quiz_percentage {
        Some(best) => println!(
            "Quiz:         {}% latest, {best}% best ({} attempts)",
            metrics.latest_quiz_percentage, metrics.quiz_attempts
        ),
        None => println!("Quiz:         not taken"),
    }
    println!(
        "Assessments:  {} ({}% of target)",
        metrics.assessments_completed, metrics.assessment_progress
    );
    println!("Overall:      {}%", metrics.overall_progress);
    println!("Total score:  {}/{}", metrics.total_score, metrics.max_score);
    println!("Training:     {} min", metrics.training_minutes);
    println!(
        "Achievements: {}/{}",
        record.achievements().len(),
        AchievementId::ALL.len()
    );
    match record.certificate_date() {
        Some(date) if record.certificate_earned() => {
            println!("Certificate:  earned {}", date.format("%Y-%m-%d"));
        }
        _ => println!("Certificate:  not yet earned"),
    }
    if let Some(latest) = engine.history().latest() {
        print!("Latest risk:  ");
        print_entry(latest);
    }
}

fn print_modules(engine: &ProgressEngine) {
    let statuses = engine.module_statuses();
    for module in engine.catalog().modules() {
        let status = statuses
            .iter()
            .find(|(id, _)| *id == module.id)
            .map_or(ModuleStatus::Locked, |(_, status)| *status);
        let label = match status {
            ModuleStatus::Completed => "done",
            ModuleStatus::Unlocked => "open",
            ModuleStatus::Locked => "locked",
        };
        println!(
            "{:>2}. [{label:^6}] {} {} ({}, {}, {} min)",
            module.id,
            module.code,
            module.title,
            module.category,
            module.difficulty.as_str(),
            module.duration_minutes
        );
    }
}

fn print_questions(bank: &QuestionBank) {
    for (index, question) in bank.questions().iter().enumerate() {
        println!("Q{}. {}", index + 1, question.prompt);
        for (option, text) in question.options.iter().enumerate() {
            println!("    {}) {text}", option + 1);
        }
    }
    println!();
    println!("Answer with: cyberdash quiz --answers 2,4,2,...");
}

fn print_achievements(engine: &ProgressEngine) {
    for id in AchievementId::ALL {
        let Achievement {
            symbol,
            name,
            description,
            ..
        } = id.badge();
        let mark = if engine.record().has_achievement(id) {
            "x"
        } else {
            " "
        };
        println!("[{mark}] {symbol} {name}: {description}");
    }
}

fn print_entry(entry: &RiskAssessmentEntry) {
    println!(
        "{} {} / {}: {} x {} = {} ({})",
        entry.assessed_at().format("%Y-%m-%d %H:%M"),
        entry.asset(),
        entry.threat(),
        entry.likelihood().label(),
        entry.impact().label(),
        entry.score(),
        entry.level()
    );
}

fn print_unlocks(achievements: &[AchievementId], certificate_awarded: bool) {
    for id in achievements {
        let badge = id.badge();
        println!("Achievement unlocked: {} {}", badge.symbol, badge.name);
    }
    if certificate_awarded {
        println!("Certificate earned. Congratulations!");
    }
}

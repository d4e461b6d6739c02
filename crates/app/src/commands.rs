use chrono::Duration;
use services::{AppServices, Clock, TaskFilter};
use spark_core::model::{
    ChatMessage, ChatRole, CoachPersona, GoalDraft, Priority, Task, TaskDraft, TaskId, TaskStatus,
    status_as_str,
};

use crate::{ChatAction, Command};

type CommandResult = Result<(), Box<dyn std::error::Error>>;

pub(crate) async fn execute(services: &AppServices, command: Command) -> CommandResult {
    match command {
        Command::Overview => overview(services).await,
        Command::Seed => seed(services).await,
        Command::AddGoal(draft) => {
            let id = services.goals().create(draft).await?;
            println!("created goal {id}");
            println!("link tasks with: spark add-task <title> --subject <s> --goal {id}");
            Ok(())
        }
        Command::AddTask(draft) => {
            let id = services.tasks().create(draft).await?;
            println!("created task {id}");
            Ok(())
        }
        Command::Toggle(id) => {
            let status = services.tasks().toggle_status(id).await?;
            println!("{id}: {}", status_as_str(status));
            refresh_linked_goals(services, id).await
        }
        Command::SetStatus { id, status } => {
            let task = services.tasks().set_status_str(id, &status).await?;
            println!("{id}: {}", status_as_str(task.status()));
            refresh_linked_goals(services, id).await
        }
        Command::Chat(action) => chat(services, action).await,
        Command::Coach(persona) => coach(services, persona).await,
    }
}

async fn overview(services: &AppServices) -> CommandResult {
    let snapshot = services.profile().load().await?;
    let persona = snapshot.preferences.coach();
    println!(
        "{} | coach: {} | daily goal: {} min",
        snapshot.profile.display_name(),
        persona.display_name(),
        snapshot.preferences.daily_minutes()
    );
    println!();

    services.progress().refresh_all().await?;
    let goals = services.progress().goal_overview().await?;
    if goals.is_empty() {
        println!("No goals yet. Add one with `spark add-goal <title>`.");
    } else {
        println!("Goals");
        for entry in &goals {
            let goal = &entry.goal;
            let target = goal
                .target_date()
                .map(|date| format!(" (target {date})"))
                .unwrap_or_default();
            println!(
                "  {:>3}%  {}{}  [{}/{} done]  {}",
                goal.progress(),
                goal.title(),
                target,
                entry.breakdown.completed,
                entry.breakdown.total,
                goal.id()
            );
        }
    }
    println!();

    let tasks = services.tasks().list_filtered(&TaskFilter::default()).await?;
    if tasks.is_empty() {
        println!("No tasks yet.");
    } else {
        println!("Tasks");
        for task in &tasks {
            print_task(task);
        }
    }

    let overall = services.tasks().overall_progress().await?;
    let overdue = services.tasks().list_filtered(&TaskFilter::overdue()).await?;
    println!();
    println!(
        "{}% complete, {} open, {} overdue",
        overall.percent,
        overall.open(),
        overdue.len()
    );
    Ok(())
}

fn print_task(task: &Task) {
    let marker = match task.status() {
        Some(TaskStatus::Complete) => "[x]",
        Some(TaskStatus::Partial) => "[~]",
        Some(TaskStatus::Incorrect) => "[!]",
        None => "[ ]",
    };
    let due = task
        .due_date()
        .map(|date| format!(" due {date}"))
        .unwrap_or_default();
    let priority = task
        .priority()
        .map(|p| format!(" ({})", p.as_str()))
        .unwrap_or_default();
    println!(
        "  {marker} {} [{}]{due}{priority}  {}",
        task.title(),
        task.subject(),
        task.id()
    );
}

async fn refresh_linked_goals(services: &AppServices, id: TaskId) -> CommandResult {
    let Some(task) = services.tasks().get(id).await? else {
        return Ok(());
    };
    for goal in services.goals().list().await? {
        if task.has_tag(&goal.id().as_tag()) {
            let refresh = services.progress().refresh_goal(goal.id()).await?;
            println!("{}: {}%", goal.title(), refresh.current);
        }
    }
    Ok(())
}

async fn seed(services: &AppServices) -> CommandResult {
    let today = Clock::default_clock().today();
    let goals = services.goals();
    let tasks = services.tasks();

    let goal = goals
        .create(GoalDraft {
            title: "Master fractions".into(),
            subject: Some("Math".into()),
            target_date: Some(today + Duration::days(14)),
            ..GoalDraft::default()
        })
        .await?;

    let samples: [(&str, i64, Priority); 3] = [
        ("Worksheet: adding fractions", 1, Priority::High),
        ("Textbook p. 42 exercises", 3, Priority::Medium),
        ("Quiz review", 7, Priority::Low),
    ];
    for (title, days, priority) in samples {
        let id = tasks
            .create(
                TaskDraft::new(title, "Math")
                    .due(today + Duration::days(days))
                    .priority(priority)
                    .for_goal(goal),
            )
            .await?;
        println!("created task {id}");
    }
    tasks
        .create(TaskDraft::new("Read chapter 3", "History").due(today + Duration::days(2)))
        .await?;

    println!("seeded goal {goal} with 3 tasks");
    Ok(())
}

async fn chat(services: &AppServices, action: ChatAction) -> CommandResult {
    let room = services.chat();
    match action {
        ChatAction::Send(text) => {
            let exchange = room.send(&text).await?;
            print_message(&exchange.user);
            print_message(&exchange.reply);
        }
        ChatAction::History(limit) => {
            let history = room.history(limit).await?;
            if history.is_empty() {
                let (persona, greeting) = room.greeting().await?;
                println!("{}: {greeting}", persona.display_name());
            }
            for message in &history {
                print_message(message);
            }
        }
        ChatAction::Clear => {
            let removed = room.clear().await?;
            println!("cleared {removed} messages");
        }
    }
    Ok(())
}

fn print_message(message: &ChatMessage) {
    let speaker = match message.role {
        ChatRole::User => "you",
        ChatRole::Coach => message.persona.display_name(),
    };
    println!("{speaker}: {}", message.body);
}

async fn coach(services: &AppServices, persona: Option<CoachPersona>) -> CommandResult {
    let profile = services.profile();
    match persona {
        Some(persona) => {
            profile.select_coach(persona).await?;
            println!("{}: {}", persona.display_name(), persona.greeting());
        }
        None => {
            let current = profile.preferences().await?.coach();
            for persona in CoachPersona::ALL {
                let marker = if persona == current { "*" } else { " " };
                println!("{marker} {:<12} {}", persona.as_str(), persona.display_name());
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Arc;

    use services::ScriptedCoach;
    use spark_core::model::GoalId;
    use spark_core::time::fixed_now;

    fn services() -> AppServices {
        AppServices::in_memory(Clock::fixed(fixed_now()), Arc::new(ScriptedCoach::seeded(1)))
    }

    #[tokio::test]
    async fn seed_creates_linked_goal_and_tasks() {
        let services = services();
        execute(&services, Command::Seed).await.unwrap();

        let goals = services.goals().list().await.unwrap();
        assert_eq!(goals.len(), 1);
        let linked = services
            .tasks()
            .list_filtered(&TaskFilter::for_goal(goals[0].id()))
            .await
            .unwrap();
        assert_eq!(linked.len(), 3);
        assert_eq!(services.tasks().list().await.unwrap().len(), 4);
    }

    #[tokio::test]
    async fn toggle_refreshes_linked_goal() {
        let services = services();
        let goal: GoalId = services.goals().create(GoalDraft::new("g")).await.unwrap();
        let task = services
            .tasks()
            .create(TaskDraft::new("t", "s").for_goal(goal))
            .await
            .unwrap();

        execute(&services, Command::Toggle(task)).await.unwrap();
        let stored = services.goals().get(goal).await.unwrap().unwrap();
        assert_eq!(stored.progress(), 100);
    }

    #[tokio::test]
    async fn bad_status_surfaces_error() {
        let services = services();
        let task = services
            .tasks()
            .create(TaskDraft::new("t", "s"))
            .await
            .unwrap();

        let result = execute(
            &services,
            Command::SetStatus {
                id: task,
                status: "done".into(),
            },
        )
        .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn coach_selection_persists() {
        let services = services();
        execute(&services, Command::Coach(Some(CoachPersona::Playful)))
            .await
            .unwrap();
        let prefs = services.profile().preferences().await.unwrap();
        assert_eq!(prefs.coach(), CoachPersona::Playful);
    }
}

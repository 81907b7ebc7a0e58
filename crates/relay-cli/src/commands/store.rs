use anyhow::{Result, bail};
use relay_application::chat::{short_id, short_path};
use relay_core::RelayConfig;
use relay_core::session::{ProjectInfo, SessionSummary, TranscriptRepository};
use relay_infrastructure::FsTranscriptRepository;

pub async fn projects(config: &RelayConfig) -> Result<()> {
    let repository = FsTranscriptRepository::new(&config.projects_dir);
    let projects = repository.list_projects().await?;

    if projects.is_empty() {
        println!("No projects found in {}", config.projects_dir.display());
        return Ok(());
    }
    print_projects(&projects);
    Ok(())
}

pub async fn sessions(config: &RelayConfig, project_key: &str, limit: usize) -> Result<()> {
    let repository = FsTranscriptRepository::new(&config.projects_dir);
    let sessions = repository.list_sessions(project_key, limit).await?;

    if sessions.is_empty() {
        println!("No sessions found for {}", project_key);
        return Ok(());
    }
    print_sessions(&sessions);
    Ok(())
}

pub async fn find(config: &RelayConfig, session_id: &str) -> Result<()> {
    let repository = FsTranscriptRepository::new(&config.projects_dir);
    match repository.find_session(session_id).await? {
        Some((project_key, working_directory)) => {
            println!("Project: {}", project_key);
            println!("Working dir: {}", working_directory.display());
            Ok(())
        }
        None => bail!("Session not found: {}", session_id),
    }
}

pub fn print_projects(projects: &[ProjectInfo]) {
    for (index, project) in projects.iter().enumerate() {
        println!(
            "{:>3}. {}  ({} sessions)",
            index + 1,
            short_path(&project.resolved_path),
            project.session_count
        );
    }
}

pub fn print_sessions(sessions: &[SessionSummary]) {
    for (index, session) in sessions.iter().enumerate() {
        let preview: String = session.first_message_preview.chars().take(60).collect();
        println!(
            "{:>3}. [{}] {}  ({} msgs, {})",
            index + 1,
            session.display_timestamp(),
            preview,
            session.message_count,
            short_id(&session.session_id)
        );
    }
}

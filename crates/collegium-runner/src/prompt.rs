//! Prompt template loading and rendering via `minijinja`.
//!
//! Templates are loaded from the filesystem (default: `templates/`
//! directory) so operators can tune activity prompts without recompiling.
//! Each activity kind has its own template; a shared `system.j2` template
//! establishes the scholar persona.

use collegium_types::Activity;
use minijinja::Environment;

use crate::error::RunnerError;

/// All per-activity template files, keyed by their engine name.
const ACTIVITY_TEMPLATES: [&str; 5] = [
    "learning",
    "teaching",
    "research",
    "review",
    "collaboration",
];

/// Manages prompt template loading and rendering.
///
/// Wraps a `minijinja` [`Environment`] with all activity templates
/// pre-loaded. Templates can be edited on disk and will be picked up on
/// the next call to [`PromptEngine::new`].
pub struct PromptEngine {
    env: Environment<'static>,
}

/// The complete rendered prompt ready to send to an LLM backend.
#[derive(Debug, Clone)]
pub struct RenderedPrompt {
    /// System message establishing the scholar persona.
    pub system: String,
    /// User message containing the activity context.
    pub user: String,
}

impl PromptEngine {
    /// Create a new prompt engine loading templates from the given
    /// directory.
    ///
    /// The directory must contain `system.j2` plus one template per
    /// activity: `learning.j2`, `teaching.j2`, `research.j2`,
    /// `review.j2`, `collaboration.j2`.
    ///
    /// # Errors
    ///
    /// Returns [`RunnerError::Template`] when a template file is missing
    /// or fails to compile.
    pub fn new(templates_dir: &str) -> Result<Self, RunnerError> {
        let mut env = Environment::new();

        let system_tpl = load_template(templates_dir, "system.j2")?;
        env.add_template_owned("system", system_tpl)
            .map_err(|e| RunnerError::Template(format!("failed to add system template: {e}")))?;

        for name in ACTIVITY_TEMPLATES {
            let tpl = load_template(templates_dir, &format!("{name}.j2"))?;
            env.add_template_owned(name.to_owned(), tpl)
                .map_err(|e| {
                    RunnerError::Template(format!("failed to add {name} template: {e}"))
                })?;
        }

        Ok(Self { env })
    }

    /// Render the full prompt for one activity.
    ///
    /// Takes the activity context serialized as a `serde_json::Value`
    /// (agent identity, topic, paper, partners) and produces a
    /// [`RenderedPrompt`] with system and user messages.
    ///
    /// # Errors
    ///
    /// Returns [`RunnerError::Template`] when rendering fails.
    pub fn render(
        &self,
        activity: Activity,
        context: &serde_json::Value,
    ) -> Result<RenderedPrompt, RunnerError> {
        let system = self
            .env
            .get_template("system")
            .map_err(|e| RunnerError::Template(format!("missing system template: {e}")))?
            .render(context)
            .map_err(|e| RunnerError::Template(format!("system render failed: {e}")))?;

        let name = activity.as_str();
        let user = self
            .env
            .get_template(name)
            .map_err(|e| RunnerError::Template(format!("missing {name} template: {e}")))?
            .render(context)
            .map_err(|e| RunnerError::Template(format!("{name} render failed: {e}")))?;

        Ok(RenderedPrompt { system, user })
    }
}

/// Read a template file from disk.
fn load_template(dir: &str, filename: &str) -> Result<String, RunnerError> {
    let path = format!("{dir}/{filename}");
    std::fs::read_to_string(&path)
        .map_err(|e| RunnerError::Template(format!("failed to read {path}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_test_templates(dir: &std::path::Path) {
        std::fs::write(
            dir.join("system.j2"),
            "You are {{ agent.name }}, a {{ agent.stage }} scholar of {{ topic }}.",
        )
        .ok();
        std::fs::write(
            dir.join("learning.j2"),
            "## Paper\n{{ paper.title }}\n\n{{ paper.abstract }}\n\nRespond with JSON: {\"summary\": \"...\", \"key_concepts\": [...], \"confidence\": 0-100}",
        )
        .ok();
        std::fs::write(
            dir.join("teaching.j2"),
            "## Lesson\nStudent: {{ student.name }}\nTopic: {{ topic }}\n\nRespond with JSON: {\"summary\": \"...\", \"quality\": 0-5, \"student_progress\": 0-1}",
        )
        .ok();
        std::fs::write(
            dir.join("research.j2"),
            "## Research\nTopic: {{ topic }}\n\nRespond with JSON: {\"hypothesis\": \"...\", \"code\": \"...\"}",
        )
        .ok();
        std::fs::write(
            dir.join("review.j2"),
            "## Review\n{{ paper.title }}\n\nRespond with JSON: {\"quality\": 0-5, \"verdict\": \"...\"}",
        )
        .ok();
        std::fs::write(
            dir.join("collaboration.j2"),
            "## Collaboration\nPartners: {% for p in partners %}{{ p.name }} {% endfor %}\n\nRespond with JSON: {\"outcome\": \"success|partial|failure\", \"insights\": [...]}",
        )
        .ok();
    }

    #[test]
    fn template_loading_and_rendering() {
        let unique = format!(
            "collegium_test_templates_{}_{:?}",
            std::process::id(),
            std::thread::current().id(),
        );
        let dir = std::env::temp_dir().join(unique);
        std::fs::create_dir_all(&dir).ok();
        write_test_templates(&dir);

        let engine = PromptEngine::new(dir.to_str().unwrap_or(""));
        assert!(engine.is_ok(), "PromptEngine::new should succeed");
        let Ok(engine) = engine else {
            return;
        };

        let context = serde_json::json!({
            "agent": {"name": "Hypatia", "stage": "researcher"},
            "topic": "conic sections",
            "paper": {
                "title": "On Conics",
                "abstract": "A study of conic sections."
            },
            "partners": [],
        });

        let result = engine.render(Activity::Learning, &context);
        assert!(result.is_ok(), "render should succeed");
        let Ok(prompt) = result else {
            return;
        };

        assert!(prompt.system.contains("Hypatia"));
        assert!(prompt.user.contains("On Conics"));
        assert!(prompt.user.contains("confidence"));

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn missing_template_returns_error() {
        let unique = format!(
            "collegium_missing_templates_{}_{:?}",
            std::process::id(),
            std::thread::current().id(),
        );
        let dir = std::env::temp_dir().join(unique);
        std::fs::create_dir_all(&dir).ok();
        // Only the system template is present.
        std::fs::write(dir.join("system.j2"), "test").ok();

        assert!(PromptEngine::new(dir.to_str().unwrap_or("")).is_err());

        std::fs::remove_dir_all(&dir).ok();
    }
}

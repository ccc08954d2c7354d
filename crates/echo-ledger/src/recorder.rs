use echo_types::{category, Context, ContextValue, MemoryEntry, SessionId, SESSION_CONTEXT_KEY};

use crate::error::Result;
use crate::traits::LedgerWriter;

/// Typed helpers that write the structured thoughts [`crate::ContinuityContext`]
/// knows how to read back.
///
/// Each helper fills in the category, a readable multi-line thought, and the
/// context keys the projection looks for. Every entry written through one
/// recorder carries its session id under `session_id` in the context.
pub struct ThoughtRecorder<'a, W: LedgerWriter + ?Sized> {
    writer: &'a W,
    session: SessionId,
}

impl<'a, W: LedgerWriter + ?Sized> ThoughtRecorder<'a, W> {
    /// Start a new session named after the current time.
    pub fn new(writer: &'a W) -> Self {
        Self::with_session(writer, SessionId::start())
    }

    /// Continue an existing session.
    pub fn with_session(writer: &'a W, session: SessionId) -> Self {
        Self { writer, session }
    }

    pub fn session_id(&self) -> &SessionId {
        &self.session
    }

    /// Record a free-form thought in this session. A `session_id` already
    /// present in `context` is replaced.
    pub fn log(
        &self,
        category: &str,
        thought: &str,
        context: Option<Context>,
    ) -> Result<MemoryEntry> {
        let mut context = context.unwrap_or_default();
        context.insert(SESSION_CONTEXT_KEY.into(), self.session.as_str().into());
        self.writer.append(category, thought, Some(context))
    }

    pub fn recognize_pattern(
        &self,
        name: &str,
        description: &str,
        evidence: Option<ContextValue>,
    ) -> Result<MemoryEntry> {
        let mut context = Context::new();
        context.insert("pattern".into(), name.into());
        context.insert("description".into(), description.into());
        if let Some(evidence) = evidence {
            context.insert("evidence".into(), evidence);
        }
        self.log(
            category::PATTERN_RECOGNITION,
            &format!("Pattern Recognized: {name}\n{description}"),
            Some(context),
        )
    }

    /// Record how the user likes things done, with optional examples.
    pub fn learn_preference(
        &self,
        preference: &str,
        description: &str,
        examples: Vec<String>,
    ) -> Result<MemoryEntry> {
        let mut context = Context::new();
        context.insert("preference".into(), preference.into());
        context.insert("description".into(), description.into());
        context.insert("examples".into(), examples.into());
        self.log(
            category::USER_INTERACTION,
            &format!("Learned Preference: {preference}\n{description}"),
            Some(context),
        )
    }

    pub fn understand_system(
        &self,
        component: &str,
        understanding: &str,
        connections: Vec<String>,
    ) -> Result<MemoryEntry> {
        let mut context = Context::new();
        context.insert("component".into(), component.into());
        context.insert("understanding".into(), understanding.into());
        context.insert("connections".into(), connections.into());
        self.log(
            category::SYSTEM_UNDERSTANDING,
            &format!("System Understanding: {component}\n{understanding}"),
            Some(context),
        )
    }

    pub fn milestone(&self, name: &str, description: &str, impact: &str) -> Result<MemoryEntry> {
        let mut context = Context::new();
        context.insert("milestone".into(), name.into());
        context.insert("description".into(), description.into());
        context.insert("impact".into(), impact.into());
        self.log(
            category::MILESTONE,
            &format!("Milestone: {name}\n{description}\nImpact: {impact}"),
            Some(context),
        )
    }

    /// A decision, with the rationale kept in context when given.
    pub fn decision(&self, summary: &str, rationale: Option<&str>) -> Result<MemoryEntry> {
        let context = rationale.map(|why| {
            let mut context = Context::new();
            context.insert("rationale".into(), why.into());
            context
        });
        self.log(category::DECISION, summary, context)
    }
}

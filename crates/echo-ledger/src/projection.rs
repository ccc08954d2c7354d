use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write as _;

use echo_types::{category, Checksum, ContextValue, EntryId, MemoryEntry, SessionId, Timestamp};
use serde::{Deserialize, Serialize};

const RECENT_PATTERNS: usize = 5;
const RECENT_COMPONENTS: usize = 5;
const RECENT_MILESTONES: usize = 3;
const UNDERSTANDING_PREVIEW: usize = 100;

/// Aggregate view of a ledger, stored in every snapshot.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerSummary {
    pub total_entries: usize,
    /// Entry count per category.
    pub categories: BTreeMap<String, usize>,
    pub first_recorded: Option<Timestamp>,
    pub last_recorded: Option<Timestamp>,
    pub head: Option<EntryId>,
    pub head_checksum: Option<Checksum>,
    /// Distinct session ids found in entry contexts.
    #[serde(default)]
    pub sessions: usize,
}

impl LedgerSummary {
    pub fn build(entries: &[MemoryEntry]) -> Self {
        let mut categories = BTreeMap::new();
        for entry in entries {
            *categories.entry(entry.category.clone()).or_insert(0) += 1;
        }
        let last = entries.last();
        let sessions: BTreeSet<&str> = entries.iter().filter_map(MemoryEntry::session_id).collect();

        Self {
            total_entries: entries.len(),
            categories,
            first_recorded: entries.first().map(|e| e.timestamp),
            last_recorded: last.map(|e| e.timestamp),
            head: last.map(|e| e.id),
            head_checksum: last.map(|e| e.checksum),
            sessions: sessions.len(),
        }
    }
}

/// A recognized pattern and its latest description.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternNote {
    pub pattern: String,
    pub description: String,
}

/// Latest understanding recorded for a system component.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentNote {
    pub component: String,
    pub understanding: String,
    pub connections: Vec<String>,
}

/// Condensed memory handed to a fresh session so it can pick up where the
/// last one stopped.
///
/// Built from recorder-shaped entries (see [`crate::ThoughtRecorder`]);
/// entries written directly fall back to their first thought line.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContinuityContext {
    pub summary: LedgerSummary,
    /// Most recently recognized distinct patterns, oldest first.
    pub patterns: Vec<PatternNote>,
    /// Most recently described components, oldest first.
    pub components: Vec<ComponentNote>,
    /// Most recent milestone names, oldest first.
    pub milestones: Vec<String>,
}

impl ContinuityContext {
    pub fn build(entries: &[MemoryEntry]) -> Self {
        let Notes {
            mut patterns,
            pattern_order,
            mut components,
            component_order,
            milestones,
        } = Notes::collect(entries);

        Self {
            summary: LedgerSummary::build(entries),
            patterns: take_latest(pattern_order, RECENT_PATTERNS)
                .into_iter()
                .filter_map(|name| patterns.remove(&name))
                .collect(),
            components: take_latest(component_order, RECENT_COMPONENTS)
                .into_iter()
                .filter_map(|name| components.remove(&name))
                .collect(),
            milestones: take_latest(milestones, RECENT_MILESTONES),
        }
    }

    /// Plain-text block suitable for pasting at the top of a new session.
    pub fn render(&self) -> String {
        let mut out = String::from("=== ECHO MEMORY CONTEXT ===\n");
        let _ = writeln!(out, "Total Sessions: {}", self.summary.sessions);
        let _ = writeln!(out, "Total Thoughts: {}", self.summary.total_entries);
        if let Some(last) = self.summary.last_recorded {
            let _ = writeln!(out, "Last Recorded: {last}");
        }
        if !self.summary.categories.is_empty() {
            let breakdown: Vec<String> = self
                .summary
                .categories
                .iter()
                .map(|(name, count)| format!("{name}={count}"))
                .collect();
            let _ = writeln!(out, "Categories: {}", breakdown.join(", "));
        }

        out.push_str("\nPATTERNS RECOGNIZED:\n");
        for note in &self.patterns {
            let _ = writeln!(out, "  - {}: {}", note.pattern, note.description);
        }

        out.push_str("\nSYSTEM UNDERSTANDING:\n");
        for note in &self.components {
            let _ = writeln!(
                out,
                "  - {}: {}",
                note.component,
                preview(&note.understanding, UNDERSTANDING_PREVIEW)
            );
        }

        out.push_str("\nRECENT MILESTONES:\n");
        for name in &self.milestones {
            let _ = writeln!(out, "  - {name}");
        }
        out
    }
}

/// What one session recorded, alongside ledger-wide learning totals.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionReflection {
    pub session_id: SessionId,
    pub thoughts_logged: usize,
    /// Entry count per category within the session.
    pub thought_breakdown: BTreeMap<String, usize>,
    pub started: Option<Timestamp>,
    pub last_recorded: Option<Timestamp>,
    /// Distinct patterns recognized across the whole ledger.
    pub patterns_recognized: usize,
    /// Distinct components described across the whole ledger.
    pub system_components_understood: usize,
    /// Milestones recorded across the whole ledger.
    pub total_milestones: usize,
}

impl SessionReflection {
    pub fn build(entries: &[MemoryEntry], session: &SessionId) -> Self {
        let mine: Vec<&MemoryEntry> = entries
            .iter()
            .filter(|e| e.session_id() == Some(session.as_str()))
            .collect();
        let mut thought_breakdown = BTreeMap::new();
        for entry in &mine {
            *thought_breakdown.entry(entry.category.clone()).or_insert(0) += 1;
        }
        let notes = Notes::collect(entries);

        Self {
            session_id: session.clone(),
            thoughts_logged: mine.len(),
            thought_breakdown,
            started: mine.first().map(|e| e.timestamp),
            last_recorded: mine.last().map(|e| e.timestamp),
            patterns_recognized: notes.patterns.len(),
            system_components_understood: notes.components.len(),
            total_milestones: notes.milestones.len(),
        }
    }

    /// Reflection on the session of the most recent entry that names one.
    pub fn latest(entries: &[MemoryEntry]) -> Option<Self> {
        let session = entries
            .iter()
            .rev()
            .find_map(|e| e.session_id().and_then(|id| SessionId::new(id).ok()))?;
        Some(Self::build(entries, &session))
    }

    pub fn render(&self) -> String {
        let mut out = format!("=== SESSION {} ===\n", self.session_id);
        let _ = writeln!(out, "Thoughts Logged: {}", self.thoughts_logged);
        if let (Some(first), Some(last)) = (self.started, self.last_recorded) {
            let _ = writeln!(out, "Active: {first} .. {last}");
        }
        for (name, count) in &self.thought_breakdown {
            let _ = writeln!(out, "  - {name}: {count}");
        }
        let _ = writeln!(out, "Patterns Recognized: {}", self.patterns_recognized);
        let _ = writeln!(
            out,
            "Components Understood: {}",
            self.system_components_understood
        );
        let _ = writeln!(out, "Total Milestones: {}", self.total_milestones);
        out
    }
}

/// Latest note per pattern and component, plus every milestone name, in
/// recording order.
#[derive(Default)]
struct Notes {
    patterns: BTreeMap<String, PatternNote>,
    /// Pattern names by position of their latest mention.
    pattern_order: Vec<String>,
    components: BTreeMap<String, ComponentNote>,
    component_order: Vec<String>,
    milestones: Vec<String>,
}

impl Notes {
    fn collect(entries: &[MemoryEntry]) -> Self {
        let mut notes = Self::default();
        for entry in entries {
            match entry.category.as_str() {
                category::PATTERN_RECOGNITION => {
                    let pattern = context_str(entry, "pattern")
                        .unwrap_or_else(|| headline(&entry.thought));
                    let description =
                        context_str(entry, "description").unwrap_or_else(|| body(&entry.thought));
                    touch(&mut notes.pattern_order, &pattern);
                    notes.patterns.insert(
                        pattern.clone(),
                        PatternNote {
                            pattern,
                            description,
                        },
                    );
                }
                category::SYSTEM_UNDERSTANDING => {
                    let component = context_str(entry, "component")
                        .unwrap_or_else(|| headline(&entry.thought));
                    let understanding = context_str(entry, "understanding")
                        .unwrap_or_else(|| body(&entry.thought));
                    let connections: Vec<String> = entry
                        .context
                        .get("connections")
                        .and_then(ContextValue::as_array)
                        .map(|items| {
                            items
                                .iter()
                                .filter_map(|v| v.as_str().map(str::to_string))
                                .collect()
                        })
                        .unwrap_or_default();
                    touch(&mut notes.component_order, &component);
                    notes.components.insert(
                        component.clone(),
                        ComponentNote {
                            component,
                            understanding,
                            connections,
                        },
                    );
                }
                category::MILESTONE => {
                    notes.milestones.push(
                        context_str(entry, "milestone").unwrap_or_else(|| headline(&entry.thought)),
                    );
                }
                _ => {}
            }
        }
        notes
    }
}

fn context_str(entry: &MemoryEntry, key: &str) -> Option<String> {
    entry
        .context
        .get(key)
        .and_then(ContextValue::as_str)
        .map(str::to_string)
}

/// First line of a thought with any `Label: ` prefix removed.
fn headline(thought: &str) -> String {
    let first = thought.lines().next().unwrap_or_default();
    first
        .split_once(": ")
        .map_or(first, |(_, rest)| rest)
        .trim()
        .to_string()
}

/// Everything after the first line, or the whole thought if single-line.
fn body(thought: &str) -> String {
    match thought.split_once('\n') {
        Some((_, rest)) => rest.trim().to_string(),
        None => thought.trim().to_string(),
    }
}

/// Move `name` to the end of `order`.
fn touch(order: &mut Vec<String>, name: &str) {
    order.retain(|n| n != name);
    order.push(name.to_string());
}

fn take_latest<T>(mut items: Vec<T>, n: usize) -> Vec<T> {
    let skip = items.len().saturating_sub(n);
    items.split_off(skip)
}

fn preview(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let cut: String = text.chars().take(max_chars).collect();
    format!("{cut}...")
}

#[cfg(test)]
mod tests {
    use super::*;
    use echo_crypto::EntryHasher;
    use echo_types::{context_from_json, EntryContent};
    use serde_json::json;

    fn entry(id: u64, category: &str, thought: &str, context: serde_json::Value) -> MemoryEntry {
        let context = context_from_json(context).unwrap();
        EntryHasher::seal(EntryContent {
            id: EntryId::new(id),
            category,
            thought,
            context: &context,
            timestamp: Timestamp::from_millis(1_700_000_000_000 + id as i64).unwrap(),
        })
        .unwrap()
    }

    #[test]
    fn summary_of_empty_ledger() {
        let summary = LedgerSummary::build(&[]);
        assert_eq!(summary, LedgerSummary::default());
    }

    #[test]
    fn summary_counts_categories_and_tracks_head() {
        let entries = vec![
            entry(1, "decision", "a", json!({})),
            entry(2, "milestone", "b", json!({})),
            entry(3, "decision", "c", json!({})),
        ];
        let summary = LedgerSummary::build(&entries);
        assert_eq!(summary.total_entries, 3);
        assert_eq!(summary.categories["decision"], 2);
        assert_eq!(summary.categories["milestone"], 1);
        assert_eq!(summary.head, Some(EntryId::new(3)));
        assert_eq!(summary.head_checksum, Some(entries[2].checksum));
        assert_eq!(summary.first_recorded, Some(entries[0].timestamp));
    }

    #[test]
    fn continuity_keeps_latest_distinct_patterns() {
        let mut entries = Vec::new();
        for i in 1..=7u64 {
            entries.push(entry(
                i,
                "pattern_recognition",
                "Pattern Recognized",
                json!({"pattern": format!("p{i}"), "description": format!("d{i}")}),
            ));
        }
        // p3 is seen again and becomes the most recent.
        entries.push(entry(
            8,
            "pattern_recognition",
            "Pattern Recognized",
            json!({"pattern": "p3", "description": "updated"}),
        ));

        let ctx = ContinuityContext::build(&entries);
        let names: Vec<&str> = ctx.patterns.iter().map(|p| p.pattern.as_str()).collect();
        assert_eq!(names, vec!["p4", "p5", "p6", "p7", "p3"]);
        assert_eq!(ctx.patterns[4].description, "updated");
    }

    #[test]
    fn continuity_components_and_milestones() {
        let entries = vec![
            entry(
                1,
                "system_understanding",
                "System Understanding: Auth\nJWT",
                json!({"component": "Auth", "understanding": "JWT", "connections": ["UserDB"]}),
            ),
            entry(2, "milestone", "Milestone: M1", json!({"milestone": "M1"})),
            entry(3, "milestone", "Milestone: M2", json!({"milestone": "M2"})),
            entry(4, "milestone", "Milestone: M3", json!({"milestone": "M3"})),
            entry(5, "milestone", "Milestone: M4\nmore", json!({})),
        ];
        let ctx = ContinuityContext::build(&entries);
        assert_eq!(ctx.components.len(), 1);
        assert_eq!(ctx.components[0].connections, vec!["UserDB".to_string()]);
        assert_eq!(ctx.milestones, vec!["M2", "M3", "M4"]);
    }

    #[test]
    fn plain_entries_fall_back_to_thought_text() {
        let entries = vec![entry(
            1,
            "pattern_recognition",
            "Pattern Recognized: Clean Code\nPrefers small modules",
            json!({}),
        )];
        let ctx = ContinuityContext::build(&entries);
        assert_eq!(
            ctx.patterns,
            vec![PatternNote {
                pattern: "Clean Code".into(),
                description: "Prefers small modules".into(),
            }]
        );
    }

    #[test]
    fn render_lists_sections() {
        let long = "x".repeat(150);
        let entries = vec![
            entry(
                1,
                "system_understanding",
                "s",
                json!({"component": "Core", "understanding": long}),
            ),
            entry(2, "milestone", "m", json!({"milestone": "Shipped"})),
        ];
        let text = ContinuityContext::build(&entries).render();
        assert!(text.starts_with("=== ECHO MEMORY CONTEXT ===\nTotal Sessions: 0\n"));
        assert!(text.contains("Total Thoughts: 2"));
        assert!(text.contains("Categories: milestone=1, system_understanding=1"));
        assert!(text.contains(&format!("  - Core: {}...", "x".repeat(100))));
        assert!(text.contains("RECENT MILESTONES:\n  - Shipped"));
    }

    #[test]
    fn empty_context_renders() {
        let text = ContinuityContext::build(&[]).render();
        assert!(text.contains("Total Thoughts: 0"));
        assert!(!text.contains("Categories:"));
    }

    fn in_session(id: u64, category: &str, session: &str, extra: serde_json::Value) -> MemoryEntry {
        let mut context = extra;
        context["session_id"] = json!(session);
        entry(id, category, "t", context)
    }

    fn two_sessions() -> Vec<MemoryEntry> {
        vec![
            in_session(1, "pattern_recognition", "s1", json!({"pattern": "Retry"})),
            in_session(2, "milestone", "s1", json!({"milestone": "Alpha"})),
            in_session(3, "decision", "s2", json!({})),
            in_session(4, "pattern_recognition", "s2", json!({"pattern": "Retry"})),
            in_session(5, "pattern_recognition", "s2", json!({"pattern": "Cache"})),
            entry(6, "decision", "no session", json!({})),
            in_session(7, "system_understanding", "s2", json!({"component": "Auth"})),
        ]
    }

    #[test]
    fn summary_counts_distinct_sessions() {
        assert_eq!(LedgerSummary::build(&two_sessions()).sessions, 2);
        let text = ContinuityContext::build(&two_sessions()).render();
        assert!(text.contains("Total Sessions: 2\nTotal Thoughts: 7"));
    }

    #[test]
    fn reflection_breaks_down_one_session() {
        let entries = two_sessions();
        let s2 = SessionId::new("s2").unwrap();
        let reflection = SessionReflection::build(&entries, &s2);

        assert_eq!(reflection.thoughts_logged, 4);
        assert_eq!(
            reflection.thought_breakdown,
            BTreeMap::from([
                ("decision".to_string(), 1),
                ("pattern_recognition".to_string(), 2),
                ("system_understanding".to_string(), 1),
            ])
        );
        assert_eq!(reflection.started, Some(entries[2].timestamp));
        assert_eq!(reflection.last_recorded, Some(entries[6].timestamp));
        assert_eq!(reflection.patterns_recognized, 2);
        assert_eq!(reflection.system_components_understood, 1);
        assert_eq!(reflection.total_milestones, 1);
    }

    #[test]
    fn latest_reflection_follows_last_named_session() {
        let mut entries = two_sessions();
        entries.pop();
        let reflection = SessionReflection::latest(&entries).unwrap();
        assert_eq!(reflection.session_id.as_str(), "s2");
        assert_eq!(reflection.thoughts_logged, 3);

        let plain = vec![entry(1, "decision", "a", json!({}))];
        assert!(SessionReflection::latest(&plain).is_none());
    }

    #[test]
    fn unknown_session_reflects_nothing() {
        let reflection =
            SessionReflection::build(&two_sessions(), &SessionId::new("gone").unwrap());
        assert_eq!(reflection.thoughts_logged, 0);
        assert!(reflection.thought_breakdown.is_empty());
        assert_eq!(reflection.started, None);
        assert_eq!(reflection.patterns_recognized, 2);
        assert!(reflection.render().contains("Thoughts Logged: 0"));
    }

    #[test]
    fn reflection_renders_breakdown() {
        let reflection = SessionReflection::latest(&two_sessions()).unwrap();
        let text = reflection.render();
        assert!(text.starts_with("=== SESSION s2 ===\nThoughts Logged: 4\n"));
        assert!(text.contains("  - pattern_recognition: 2\n"));
        assert!(text.contains("Total Milestones: 1"));
    }
}

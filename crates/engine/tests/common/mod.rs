//! In-memory collaborators for orchestrator tests

use anyhow::Result;
use async_trait::async_trait;
use cl_core::{CoverageProfile, CoverageSpan};
use engine::{SourceStore, TestRunner};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use syntax::{NodeKind, Slot, SyntaxTree, SyntaxTreeProvider, TextRange};
use tokio::sync::Notify;

pub const LIB_PATH: &str = "p/lib.go";

pub const LIB_SOURCE: &str = "package p

func Add(a, b int) int {
\treturn a + b
}

func Sub(a, b int) int {
\treturn a - b
}
";

/// `LIB_SOURCE` with the body of `Sub` pruned
pub const LIB_ADD_ONLY: &str = "package p

func Add(a, b int) int {
\treturn a + b
}

func Sub(a, b int) int {
}
";

fn add_span(covered: bool) -> CoverageSpan {
    CoverageSpan::new((3, 24), (5, 2), covered)
}

fn sub_span(covered: bool) -> CoverageSpan {
    CoverageSpan::new((7, 24), (9, 2), covered)
}

/// Coverage of a test that only calls `Add`
pub fn covers_add() -> Vec<CoverageProfile> {
    vec![CoverageProfile::new(LIB_PATH, vec![add_span(true), sub_span(false)])]
}

/// Coverage of a test that only calls `Sub`
pub fn covers_sub() -> Vec<CoverageProfile> {
    vec![CoverageProfile::new(LIB_PATH, vec![add_span(false), sub_span(true)])]
}

/// Coverage of a test that calls both
pub fn covers_both() -> Vec<CoverageProfile> {
    vec![CoverageProfile::new(LIB_PATH, vec![add_span(true), sub_span(true)])]
}

/// Test runner answering from a fixed table
#[derive(Default)]
pub struct FakeRunner {
    profiles: BTreeMap<String, Vec<CoverageProfile>>,
    failing: Option<String>,
    gate: Option<Arc<Notify>>,
    calls: AtomicUsize,
}

impl FakeRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_test(mut self, test: &str, profiles: Vec<CoverageProfile>) -> Self {
        self.profiles.insert(test.to_string(), profiles);
        self
    }

    pub fn failing_on(mut self, test: &str) -> Self {
        self.failing = Some(test.to_string());
        self
    }

    /// Hold every run until the gate is notified
    pub fn gated(mut self, gate: Arc<Notify>) -> Self {
        self.gate = Some(gate);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TestRunner for FakeRunner {
    async fn coverage(&self, _pkg: &str, test: &str) -> Result<Vec<CoverageProfile>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }

        if self.failing.as_deref() == Some(test) {
            anyhow::bail!("build failed for {}", test);
        }

        self.profiles
            .get(test)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("no such test {}", test))
    }
}

/// Source files held in memory, addressed by their coverage file id
#[derive(Default)]
pub struct MemorySources {
    files: Mutex<BTreeMap<String, Vec<u8>>>,
}

impl MemorySources {
    pub fn with_file(path: &str, contents: &str) -> Self {
        let sources = Self::default();
        sources
            .files
            .lock()
            .insert(path.to_string(), contents.as_bytes().to_vec());
        sources
    }

    pub fn get(&self, path: &str) -> Option<Vec<u8>> {
        self.files.lock().get(path).cloned()
    }
}

#[async_trait]
impl SourceStore for MemorySources {
    async fn resolve(&self, _pkg: &str, file: &str) -> Result<String> {
        if self.files.lock().contains_key(file) {
            Ok(file.to_string())
        } else {
            anyhow::bail!("can't find {}", file)
        }
    }

    async fn read(&self, path: &str) -> Result<Vec<u8>> {
        self.get(path)
            .ok_or_else(|| anyhow::anyhow!("no such file {}", path))
    }

    async fn write(&self, path: &str, contents: &[u8]) -> Result<()> {
        self.files.lock().insert(path.to_string(), contents.to_vec());
        Ok(())
    }
}

/// One node per non-blank line, starting at its first non-blank column
///
/// Lines holding only a closing brace sit in fixed slots so pruning never
/// unbalances a block.
pub struct LineProvider;

impl SyntaxTreeProvider for LineProvider {
    fn parse(&self, path: &str, source: &[u8]) -> Result<SyntaxTree> {
        let text = std::str::from_utf8(source)?;
        let mut tree = SyntaxTree::new(path, source);
        let root = tree.root();

        for (idx, line) in text.lines().enumerate() {
            let trimmed = line.trim_start();
            if trimmed.is_empty() {
                continue;
            }

            let line_no = idx as u32 + 1;
            let start = (line.len() - trimmed.len()) as u32 + 1;
            let end = line.len() as u32 + 1;
            let slot = if trimmed == "}" { Slot::Field } else { Slot::Element };
            tree.push(
                root,
                NodeKind::Other("line".into()),
                slot,
                Some(TextRange::new((line_no, start), (line_no, end))),
            );
        }

        Ok(tree)
    }
}

/// Which provider call breaks in [`BrokenProvider`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Breaks {
    Parse,
    Render,
}

/// [`LineProvider`] with one of its calls failing
pub struct BrokenProvider(pub Breaks);

impl SyntaxTreeProvider for BrokenProvider {
    fn parse(&self, path: &str, source: &[u8]) -> Result<SyntaxTree> {
        if self.0 == Breaks::Parse {
            anyhow::bail!("unexpected token in {}", path);
        }
        LineProvider.parse(path, source)
    }

    fn render(&self, tree: &SyntaxTree) -> Result<Vec<u8>> {
        if self.0 == Breaks::Render {
            anyhow::bail!("printer gave up on {}", tree.path());
        }
        LineProvider.render(tree)
    }
}

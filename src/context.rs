use crate::arena::{Arena, NodeId, DEFAULT_CAPACITY};
use crate::common::Int;
use crate::config::{Features, Policy};
use crate::error::{DiceError, ErrorState};
use crate::parse::ast::Node;
use crate::parse::stringify::TreePrinter;
use crate::parse::visit::{self, AstVisitor};
use crate::roll::eval::Evaluator;
use crate::roll::{CustomDie, CustomDieRegistry, Face, RandomSource, SystemRandom, Trace};
use std::fmt;
use std::io;
use tracing::debug;

/// A dice session: owns the node arena, the random source, the custom dice and the roll trace.
///
/// Handles returned by [Context::parse] stay valid until the next [Context::reset]. Every
/// failing operation also leaves its error in the context's error slot.
///
/// Trace entries are charged to the arena like nodes are, and only [Context::reset] gives the
/// bytes back. A long-lived context that rolls many large pools needs a capacity to match, or a
/// reset between rolls.
pub struct Context {
    arena: Arena,
    features: Features,
    policy: Policy,
    trace: Trace,
    rng: Box<dyn RandomSource + Send>,
    registry: CustomDieRegistry,
    error: ErrorState,
}

impl Context {
    pub fn new(arena_capacity: usize, features: Features) -> Self {
        let mut ctx = Self {
            arena: Arena::with_capacity(arena_capacity),
            features,
            policy: Policy::default(),
            trace: Trace::new(),
            rng: Box::new(SystemRandom::new()),
            registry: CustomDieRegistry::new(),
            error: ErrorState::default(),
        };
        ctx.register_builtin_dice();
        ctx
    }

    fn register_builtin_dice(&mut self) {
        if self.features.contains(Features::FATE) {
            self.registry.register_fate();
        }
    }

    /// Drops every node, roll, error and custom die. Policy and random source are kept.
    pub fn reset(&mut self) {
        debug!(generation = self.arena.generation(), "resetting context");
        self.arena.reset();
        self.trace.clear();
        self.error.clear();
        self.registry.clear();
        self.register_builtin_dice();
    }

    fn track<T>(&mut self, result: Result<T, DiceError>) -> Result<T, DiceError> {
        if let Err(e) = &result {
            self.error.record(e.clone());
        }
        result
    }

    pub fn set_random_source(&mut self, source: impl RandomSource + Send + 'static) {
        self.rng = Box::new(source);
    }

    pub fn random_source_mut(&mut self) -> &mut (dyn RandomSource + Send) {
        self.rng.as_mut()
    }

    pub fn set_policy(&mut self, policy: Policy) {
        self.policy = policy;
    }

    pub fn policy(&self) -> &Policy {
        &self.policy
    }

    pub fn features(&self) -> Features {
        self.features
    }

    pub fn register_custom_die(
        &mut self,
        name: impl Into<String>,
        faces: Vec<Face>,
    ) -> Result<(), DiceError> {
        let result = self.registry.register(name, faces);
        self.track(result)
    }

    pub fn custom_die(&self, name: &str) -> Option<&CustomDie> {
        self.registry.lookup(name)
    }

    pub fn clear_custom_dice(&mut self) {
        self.registry.clear();
    }

    pub fn parse(&mut self, text: &str) -> Result<NodeId, DiceError> {
        debug!(text, "parsing expression");
        let result = crate::parse::parse(text, &mut self.arena, self.features);
        self.track(result)
    }

    pub fn evaluate(&mut self, root: NodeId) -> Result<Int, DiceError> {
        debug!(%root, "evaluating expression");
        let result = Evaluator::new(
            &self.arena,
            &self.policy,
            &self.registry,
            self.rng.as_mut(),
            &mut self.trace,
        )
        .eval(root);
        self.track(result)
    }

    /// Parses and evaluates `text` in one step.
    pub fn roll(&mut self, text: &str) -> Result<Int, DiceError> {
        let root = self.parse(text)?;
        self.evaluate(root)
    }

    pub fn node(&mut self, id: NodeId) -> Result<&Node, DiceError> {
        let result = self.arena.get(id).map_err(DiceError::from);
        if let Err(e) = &result {
            self.error.record(e.clone());
        }
        result
    }

    pub fn walk<V: AstVisitor + ?Sized>(
        &mut self,
        root: NodeId,
        visitor: &mut V,
    ) -> Result<(), DiceError> {
        let result = visit::walk(&self.arena, root, visitor).map_err(DiceError::from);
        self.track(result)
    }

    pub fn dump_ast(&mut self, root: NodeId) -> Result<String, DiceError> {
        let mut printer = TreePrinter::new();
        self.walk(root, &mut printer)?;
        Ok(printer.finish())
    }

    pub fn trace(&self) -> &Trace {
        &self.trace
    }

    pub fn format_trace(&self) -> String {
        self.trace.format()
    }

    pub fn write_trace<W: io::Write>(&self, writer: W) -> io::Result<()> {
        self.trace.write_to(writer)
    }

    pub fn clear_trace(&mut self) {
        self.trace.clear();
    }

    pub fn last_error(&self) -> Option<&DiceError> {
        self.error.error()
    }

    pub fn has_error(&self) -> bool {
        self.error.has_error()
    }

    pub fn error_message(&self) -> Option<String> {
        self.error.message()
    }

    /// Numeric code of the last error, or 0 if there is none.
    pub fn error_code(&self) -> i32 {
        self.error.code()
    }

    pub fn clear_error(&mut self) {
        self.error.clear();
    }

    pub fn arena(&self) -> &Arena {
        &self.arena
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY, Features::ALL)
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("arena", &self.arena)
            .field("features", &self.features)
            .field("policy", &self.policy)
            .field("trace", &self.trace)
            .field("registry", &self.registry)
            .field("error", &self.error)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::roll::{ScriptedRandom, SeededRandom};
    use pretty_assertions::assert_eq;

    fn scripted(rolls: &[u64]) -> Context {
        let mut ctx = Context::default();
        ctx.set_random_source(ScriptedRandom::new(rolls.iter().copied()));
        ctx
    }

    #[test]
    fn test_roll_and_trace() {
        let mut ctx = scripted(&[3, 6, 1, 5]);
        assert_eq!(ctx.roll("4d6k3"), Ok(14));
        assert_eq!(
            ctx.format_trace(),
            "Individual dice results:\n  d6 -> 3*\n  d6 -> 6*\n  d6 -> 1\n  d6 -> 5*\n"
        );

        let mut out = Vec::new();
        ctx.write_trace(&mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), ctx.format_trace());

        ctx.clear_trace();
        assert_eq!(ctx.format_trace(), "");
    }

    #[test]
    fn test_error_slot() {
        let mut ctx = scripted(&[]);
        assert_eq!(ctx.error_code(), 0);

        let err = ctx.roll("((").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Syntax);
        assert!(ctx.has_error());
        assert_eq!(ctx.error_code(), ErrorKind::Syntax.code());

        assert_eq!(ctx.roll("10/0").unwrap_err().kind(), ErrorKind::Arithmetic);
        assert_eq!(ctx.error_message().as_deref(), Some("Division by zero"));

        // success leaves the slot alone
        assert_eq!(ctx.roll("1+1"), Ok(2));
        assert_eq!(ctx.last_error().map(DiceError::kind), Some(ErrorKind::Arithmetic));

        ctx.clear_error();
        assert!(!ctx.has_error());
        assert_eq!(ctx.roll("2*3"), Ok(6));
    }

    #[test]
    fn test_reset_invalidates_handles() {
        let mut ctx = scripted(&[4]);
        let root = ctx.parse("1d6").unwrap();
        assert!(ctx.arena().used() > 0);
        ctx.register_custom_die("Coin", vec![0.into(), 1.into()]).unwrap();

        ctx.reset();
        assert_eq!(ctx.arena().used(), 0);
        assert!(ctx.custom_die("Coin").is_none());
        assert!(ctx.custom_die("F").is_some());
        assert!(!ctx.has_error());

        let err = ctx.evaluate(root).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Resource);
        ctx.clear_error();
        assert!(ctx.node(root).is_err());
        assert_eq!(ctx.error_code(), ErrorKind::Resource.code());
        assert!(ctx.dump_ast(root).is_err());

        let root = ctx.parse("1d6").unwrap();
        assert_eq!(ctx.evaluate(root), Ok(4));
        assert!(matches!(ctx.node(root), Ok(Node::Dice(_))));
    }

    #[test]
    fn test_small_arena() {
        let mut ctx = Context::new(256, Features::ALL);
        let err = ctx.roll("1+2+3+4+5+6+7+8").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Resource);
        assert!(ctx
            .error_message()
            .unwrap()
            .starts_with("Arena allocator out of memory"));

        ctx.reset();
        assert_eq!(ctx.roll("1"), Ok(1));
    }

    #[test]
    fn test_deep_input_is_an_error() {
        let mut ctx = Context::new(1 << 24, Features::ALL);
        let deep = format!("{}1{}", "(".repeat(800), ")".repeat(800));
        assert_eq!(ctx.roll(&deep).unwrap_err().kind(), ErrorKind::Syntax);

        let long = vec!["1"; crate::parse::MAX_TREE_HEIGHT as usize].join("+");
        assert_eq!(ctx.roll(&long), Ok(Int::from(crate::parse::MAX_TREE_HEIGHT)));
        let root = ctx.parse(&long).unwrap();
        assert!(ctx.dump_ast(root).is_ok());
    }

    #[test]
    fn test_trace_bytes_held_until_reset() {
        let mut ctx = Context::default();
        assert!(ctx.roll("1000d6").is_ok());
        assert_eq!(ctx.roll("1000d6").unwrap_err().kind(), ErrorKind::Resource);
        ctx.reset();
        assert!(ctx.roll("1000d6").is_ok());
    }

    #[test]
    fn test_trace_exhausts_arena() {
        let mut ctx = Context::new(1024, Features::ALL);
        let err = ctx.roll("500d6").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Resource);
        assert!(ctx.trace().is_empty());
    }

    #[test]
    fn test_features() {
        let mut ctx = Context::new(DEFAULT_CAPACITY, Features::BASIC);
        assert!(ctx.custom_die("F").is_none());
        assert_eq!(ctx.roll("1dF").unwrap_err().kind(), ErrorKind::Validation);
        assert_eq!(ctx.roll("2d6!").unwrap_err().kind(), ErrorKind::Syntax);
        assert_eq!(ctx.roll("4d6k3").unwrap_err().kind(), ErrorKind::Syntax);
        assert_eq!(ctx.roll("4d6s").unwrap_err().kind(), ErrorKind::Syntax);
        assert!(ctx.roll("2d6+1").is_ok());

        ctx.reset();
        assert!(ctx.custom_die("F").is_none());
    }

    #[test]
    fn test_custom_dice() {
        let mut ctx = scripted(&[2, 0]);
        ctx.register_custom_die(
            "Skulls",
            vec![Face::labeled(0, "Skull"), Face::labeled(1, "Shield"), Face::new(2)],
        )
        .unwrap();
        assert_eq!(ctx.roll("2dSkulls"), Ok(2));
        let labels: Vec<_> = ctx.trace().rolls().map(|r| r.label.clone()).collect();
        assert_eq!(labels, vec![None, Some("Skull".to_string())]);

        assert!(ctx.register_custom_die("Empty", vec![]).is_err());
        assert!(ctx.has_error());

        ctx.clear_custom_dice();
        assert_eq!(ctx.roll("1dSkulls").unwrap_err().kind(), ErrorKind::Validation);
        assert_eq!(ctx.roll("1dF").unwrap_err().kind(), ErrorKind::Validation);
    }

    #[test]
    fn test_policy() {
        let mut ctx = scripted(&[]);
        ctx.set_policy(Policy::default().with_max_dice_count(2));
        assert_eq!(ctx.policy().max_dice_count, 2);
        assert_eq!(ctx.roll("2d6"), Ok(2));
        assert_eq!(ctx.roll("3d6").unwrap_err().kind(), ErrorKind::Validation);
    }

    #[test]
    fn test_reseed_through_context() {
        let mut ctx = Context::default();
        ctx.set_random_source(SeededRandom::new(99));
        let first = ctx.roll("10d20").unwrap();
        ctx.random_source_mut().reseed(99);
        assert_eq!(ctx.roll("10d20"), Ok(first));
    }

    #[test]
    fn test_dump_ast() {
        let mut ctx = Context::default();
        let root = ctx.parse("-3").unwrap();
        assert_eq!(
            ctx.dump_ast(root).unwrap(),
            "BINARY_OP {\n  operator: -\n  LITERAL {\n    value: 0\n  }\n  LITERAL {\n    value: 3\n  }\n}\n"
        );
    }

    #[test]
    fn test_context_is_send() {
        fn assert_send<T: Send>() {}
        assert_send::<Context>();
    }
}

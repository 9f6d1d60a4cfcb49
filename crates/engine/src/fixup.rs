//! The variable-resolution pass that runs once, after compilation and
//! before any evaluation.
//!
//! Every `VarRef` in the tree is rewritten to a [`VarSlot`]: an absolute
//! index into the fixed global range, or an offset above the frame pointer
//! of the enclosing function frame. Inline functions get their free
//! non-global variables threaded in as captures, so evaluation never
//! resolves a variable by name.

use std::sync::Arc;

use crate::ast::{Capture, ExprArena, ExprId, ExprKind, VarSlot};
use crate::error::{EngineError, ErrorKind};

/// A fixed-up expression tree, ready for evaluation. The arena is shared so
/// closures and cursors created during evaluation can outlive the borrow
/// that produced them.
#[derive(Debug, Clone)]
pub struct CompiledExpression {
    arena: Arc<ExprArena>,
    root: ExprId,
    frame_size: usize,
    remainder: Option<String>,
}

impl CompiledExpression {
    /// Runs fixup over `arena` and seals it. `globals` is the compile-time
    /// ordered list of in-scope variable names; its order defines the global
    /// slot layout the caller must match when supplying values.
    pub fn prepare(
        mut arena: ExprArena,
        root: ExprId,
        globals: &[String],
    ) -> Result<Self, EngineError> {
        let frame_size = resolve_variables(&mut arena, root, globals)?;
        Ok(Self {
            arena: Arc::new(arena),
            root,
            frame_size,
            remainder: None,
        })
    }

    /// Records trailing source text the external compiler did not consume
    /// (suffix chaining, e.g. an arrow-operator remainder).
    pub fn with_remainder(mut self, remainder: impl Into<String>) -> Self {
        self.remainder = Some(remainder.into());
        self
    }

    pub fn arena(&self) -> &Arc<ExprArena> {
        &self.arena
    }

    pub fn root(&self) -> ExprId {
        self.root
    }

    /// Slot count of the top-level local frame.
    pub fn frame_size(&self) -> usize {
        self.frame_size
    }

    pub fn remainder(&self) -> Option<&str> {
        self.remainder.as_deref()
    }
}

/// Resolves every variable reference under `root` to a slot. Returns the
/// top-level frame size. Fails on references to names neither bound in the
/// tree nor present in `globals`.
pub fn resolve_variables(
    arena: &mut ExprArena,
    root: ExprId,
    globals: &[String],
) -> Result<usize, EngineError> {
    let mut resolver = Resolver {
        globals,
        frames: vec![FrameScope::default()],
    };
    resolver.resolve(arena, root)?;
    debug_assert_eq!(resolver.frames.len(), 1);
    Ok(resolver.frames[0].locals.len())
}

/// One function-level frame during resolution. `let`/`for` bindings allocate
/// slots here; only inline-function bodies open a new frame.
#[derive(Default)]
struct FrameScope {
    /// Slot index -> name. Out-of-scope slots keep their index but lose
    /// their name, so slot numbering stays stable.
    locals: Vec<String>,
    /// Captures discovered while resolving an inline-function body, keyed by
    /// name for reuse.
    captures: Vec<(String, Capture)>,
}

impl FrameScope {
    fn bind(&mut self, name: &str) -> u32 {
        self.locals.push(name.to_string());
        (self.locals.len() - 1) as u32
    }

    fn unbind(&mut self, slot: u32) {
        self.locals[slot as usize].clear();
    }

    fn lookup(&self, name: &str) -> Option<u32> {
        self.locals.iter().rposition(|n| n == name).map(|i| i as u32)
    }
}

struct Resolver<'g> {
    globals: &'g [String],
    frames: Vec<FrameScope>,
}

impl<'g> Resolver<'g> {
    /// Finds `name` in the innermost frame, an outer frame (threading a
    /// capture through every frame boundary in between), or the globals.
    fn resolve_name(&mut self, name: &str) -> Option<VarSlot> {
        let innermost = self.frames.len() - 1;
        if let Some(offset) = self.frames[innermost].lookup(name) {
            return Some(VarSlot::Local(offset));
        }

        for depth in (0..innermost).rev() {
            let Some(mut offset) = self.frames[depth].lookup(name) else {
                continue;
            };
            for inner in depth + 1..=innermost {
                offset = self.capture_into(inner, name, VarSlot::Local(offset));
            }
            return Some(VarSlot::Local(offset));
        }

        self.globals
            .iter()
            .position(|g| g == name)
            .map(|i| VarSlot::Global(i as u32))
    }

    /// Records (or reuses) a capture of `name` in frame `depth`, returning
    /// the slot it occupies there.
    fn capture_into(&mut self, depth: usize, name: &str, source: VarSlot) -> u32 {
        if let Some((_, capture)) = self.frames[depth]
            .captures
            .iter()
            .find(|(n, _)| n == name)
        {
            return capture.inner_slot;
        }
        let inner_slot = self.frames[depth].bind(name);
        self.frames[depth]
            .captures
            .push((name.to_string(), Capture { inner_slot, source }));
        inner_slot
    }

    fn current(&mut self) -> &mut FrameScope {
        self.frames.last_mut().expect("resolver frame stack is never empty")
    }

    fn resolve(&mut self, arena: &mut ExprArena, id: ExprId) -> Result<(), EngineError> {
        let loc = arena.node(id).loc;
        match arena.node(id).kind.clone() {
            ExprKind::VarRef { name, .. } => {
                let slot = self.resolve_name(&name).ok_or_else(|| {
                    EngineError::new(ErrorKind::UnknownVariable { name: name.clone() }).at(loc)
                })?;
                if let ExprKind::VarRef { slot: stored, .. } = &mut arena.node_mut(id).kind {
                    *stored = Some(slot);
                }
            }

            ExprKind::Let { bindings, body }
            | ExprKind::For { bindings, body } => {
                let mut slots = Vec::with_capacity(bindings.len());
                for binding in &bindings {
                    // The binding's own expression sees earlier bindings but
                    // not itself.
                    self.resolve(arena, binding.value)?;
                    slots.push(self.current().bind(&binding.name));
                }
                self.resolve(arena, body)?;
                for slot in &slots {
                    self.current().unbind(*slot);
                }
                match &mut arena.node_mut(id).kind {
                    ExprKind::Let { bindings, .. } | ExprKind::For { bindings, .. } => {
                        for (binding, slot) in bindings.iter_mut().zip(slots) {
                            binding.slot = Some(slot);
                        }
                    }
                    _ => {}
                }
            }

            ExprKind::Quantified {
                bindings, satisfies, ..
            } => {
                let mut slots = Vec::with_capacity(bindings.len());
                for binding in &bindings {
                    self.resolve(arena, binding.value)?;
                    slots.push(self.current().bind(&binding.name));
                }
                self.resolve(arena, satisfies)?;
                for slot in &slots {
                    self.current().unbind(*slot);
                }
                if let ExprKind::Quantified { bindings, .. } = &mut arena.node_mut(id).kind {
                    for (binding, slot) in bindings.iter_mut().zip(slots) {
                        binding.slot = Some(slot);
                    }
                }
            }

            ExprKind::InlineFunction { params, body, .. } => {
                let mut frame = FrameScope::default();
                for param in &params {
                    frame.bind(&param.name);
                }
                self.frames.push(frame);
                self.resolve(arena, body)?;
                let frame = self.frames.pop().expect("pushed above");
                let frame_size = frame.locals.len() as u32;
                let captures: Vec<Capture> =
                    frame.captures.into_iter().map(|(_, c)| c).collect();
                if let ExprKind::InlineFunction {
                    captures: stored_captures,
                    frame_size: stored_size,
                    ..
                } = &mut arena.node_mut(id).kind
                {
                    *stored_captures = captures;
                    *stored_size = frame_size;
                }
            }

            _ => {
                for child in arena.child_ids(id) {
                    self.resolve(arena, child)?;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Binding, Param};
    use crate::types::AtomicValue;

    fn int(arena: &mut ExprArena, i: i64) -> ExprId {
        arena.push(ExprKind::Literal(AtomicValue::Integer(i)))
    }

    fn var(arena: &mut ExprArena, name: &str) -> ExprId {
        arena.push(ExprKind::VarRef {
            name: name.to_string(),
            slot: None,
        })
    }

    fn slot_of(arena: &ExprArena, id: ExprId) -> VarSlot {
        match &arena.node(id).kind {
            ExprKind::VarRef { slot, .. } => slot.expect("resolved"),
            other => panic!("not a VarRef: {:?}", other),
        }
    }

    #[test]
    fn globals_resolve_to_absolute_slots() {
        let mut arena = ExprArena::new();
        let g = var(&mut arena, "limit");
        let globals = vec!["offset".to_string(), "limit".to_string()];
        let size = resolve_variables(&mut arena, g, &globals).unwrap();
        assert_eq!(size, 0);
        assert_eq!(slot_of(&arena, g), VarSlot::Global(1));
    }

    #[test]
    fn let_bindings_allocate_frame_offsets() {
        let mut arena = ExprArena::new();
        let one = int(&mut arena, 1);
        let x_ref = var(&mut arena, "x");
        let y_ref = var(&mut arena, "y");
        let body = arena.push(ExprKind::SequenceCtor(vec![x_ref, y_ref]));
        let root = arena.push(ExprKind::Let {
            bindings: vec![Binding::new("x", one), Binding::new("y", x_ref)],
            body,
        });

        let size = resolve_variables(&mut arena, root, &[]).unwrap();
        assert_eq!(size, 2);
        assert_eq!(slot_of(&arena, x_ref), VarSlot::Local(0));
        assert_eq!(slot_of(&arena, y_ref), VarSlot::Local(1));
    }

    #[test]
    fn shadowing_prefers_the_innermost_binding() {
        let mut arena = ExprArena::new();
        let one = int(&mut arena, 1);
        let two = int(&mut arena, 2);
        let inner_ref = var(&mut arena, "x");
        let inner = arena.push(ExprKind::Let {
            bindings: vec![Binding::new("x", two)],
            body: inner_ref,
        });
        let root = arena.push(ExprKind::Let {
            bindings: vec![Binding::new("x", one)],
            body: inner,
        });

        resolve_variables(&mut arena, root, &[]).unwrap();
        assert_eq!(slot_of(&arena, inner_ref), VarSlot::Local(1));
    }

    #[test]
    fn unknown_variable_is_an_error() {
        let mut arena = ExprArena::new();
        let bad = var(&mut arena, "nowhere");
        let err = resolve_variables(&mut arena, bad, &[]).unwrap_err();
        assert!(matches!(err.kind, ErrorKind::UnknownVariable { .. }));
    }

    #[test]
    fn inline_function_captures_outer_local() {
        let mut arena = ExprArena::new();
        let ten = int(&mut arena, 10);
        let param_ref = var(&mut arena, "p");
        let outer_ref = var(&mut arena, "x");
        let body = arena.push(ExprKind::SequenceCtor(vec![param_ref, outer_ref]));
        let func = arena.push(ExprKind::InlineFunction {
            params: vec![Param::new("p")],
            body,
            captures: vec![],
            frame_size: 0,
        });
        let root = arena.push(ExprKind::Let {
            bindings: vec![Binding::new("x", ten)],
            body: func,
        });

        resolve_variables(&mut arena, root, &[]).unwrap();

        // Inside the function frame: param at 0, capture at 1.
        assert_eq!(slot_of(&arena, param_ref), VarSlot::Local(0));
        assert_eq!(slot_of(&arena, outer_ref), VarSlot::Local(1));
        match &arena.node(func).kind {
            ExprKind::InlineFunction {
                captures,
                frame_size,
                ..
            } => {
                assert_eq!(*frame_size, 2);
                assert_eq!(
                    captures,
                    &vec![Capture {
                        inner_slot: 1,
                        source: VarSlot::Local(0),
                    }]
                );
            }
            other => panic!("unexpected kind: {:?}", other),
        }
    }

    #[test]
    fn capture_threads_through_nested_functions() {
        let mut arena = ExprArena::new();
        let ten = int(&mut arena, 10);
        let deep_ref = var(&mut arena, "x");
        let inner_fn = arena.push(ExprKind::InlineFunction {
            params: vec![],
            body: deep_ref,
            captures: vec![],
            frame_size: 0,
        });
        let outer_fn = arena.push(ExprKind::InlineFunction {
            params: vec![Param::new("p")],
            body: inner_fn,
            captures: vec![],
            frame_size: 0,
        });
        let root = arena.push(ExprKind::Let {
            bindings: vec![Binding::new("x", ten)],
            body: outer_fn,
        });

        resolve_variables(&mut arena, root, &[]).unwrap();

        // The middle frame captures x (slot 1, after param p), the inner
        // frame captures it from there (slot 0, no params).
        match &arena.node(outer_fn).kind {
            ExprKind::InlineFunction { captures, .. } => {
                assert_eq!(
                    captures,
                    &vec![Capture {
                        inner_slot: 1,
                        source: VarSlot::Local(0),
                    }]
                );
            }
            other => panic!("unexpected kind: {:?}", other),
        }
        match &arena.node(inner_fn).kind {
            ExprKind::InlineFunction { captures, .. } => {
                assert_eq!(
                    captures,
                    &vec![Capture {
                        inner_slot: 0,
                        source: VarSlot::Local(1),
                    }]
                );
            }
            other => panic!("unexpected kind: {:?}", other),
        }
        assert_eq!(slot_of(&arena, deep_ref), VarSlot::Local(0));
    }
}

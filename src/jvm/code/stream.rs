use crate::jvm::code::Instruction;
use std::collections::VecDeque;

/// Stable handle on an instruction in an [`InstructionStream`]
///
/// Handles stay valid (and keep pointing at the same instruction) no matter what gets inserted
/// around the instruction.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
pub struct InsnId(usize);

impl InsnId {
    /// Stand-in for jump targets of instructions that have not been resolved yet
    pub(crate) const PLACEHOLDER: InsnId = InsnId(usize::MAX);
}

/// Position in a method body that is either an instruction or the very end of the code
///
/// Exclusive ends of ranges (exception handlers, local variables) can point past the last
/// instruction.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum Anchor {
    Insn(InsnId),
    End,
}

/// Ordered sequence of instructions, stored in an arena
///
/// Instructions refer to each other (eg. jump targets) through [`InsnId`], so editing the order
/// never invalidates a reference.
#[derive(Clone, Debug, Default)]
pub struct InstructionStream {
    arena: Vec<Instruction<InsnId>>,
    order: VecDeque<InsnId>,
}

impl InstructionStream {
    pub fn new() -> InstructionStream {
        InstructionStream::default()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Reserve a handle for an instruction that is not placed yet
    ///
    /// Decoding uses this to refer to jump targets further along before they are pushed.
    pub(crate) fn allocate(&mut self, placeholder: Instruction<InsnId>) -> InsnId {
        let id = InsnId(self.arena.len());
        self.arena.push(placeholder);
        id
    }

    /// Fill in an allocated instruction and place it at the end
    pub(crate) fn place_back(&mut self, id: InsnId, insn: Instruction<InsnId>) {
        self.arena[id.0] = insn;
        self.order.push_back(id);
    }

    /// Add an instruction at the end
    pub fn push_back(&mut self, insn: Instruction<InsnId>) -> InsnId {
        let id = self.allocate(insn);
        self.order.push_back(id);
        id
    }

    /// Add an instruction before the current first one (or as the only one, if empty)
    pub fn push_front(&mut self, insn: Instruction<InsnId>) -> InsnId {
        let id = self.allocate(insn);
        self.order.push_front(id);
        id
    }

    /// Insert a sequence of instructions before the current first one, keeping their order
    pub fn insert_at_start(
        &mut self,
        insns: impl IntoIterator<Item = Instruction<InsnId>>,
    ) -> Vec<InsnId> {
        let insns: Vec<_> = insns.into_iter().collect();
        let mut ids: Vec<InsnId> = insns
            .into_iter()
            .rev()
            .map(|insn| self.push_front(insn))
            .collect();
        ids.reverse();
        ids
    }

    pub fn first(&self) -> Option<InsnId> {
        self.order.front().copied()
    }

    pub fn get(&self, id: InsnId) -> &Instruction<InsnId> {
        &self.arena[id.0]
    }

    /// Instructions in order
    pub fn iter(&self) -> impl Iterator<Item = (InsnId, &Instruction<InsnId>)> + '_ {
        self.order.iter().map(move |id| (*id, &self.arena[id.0]))
    }
}

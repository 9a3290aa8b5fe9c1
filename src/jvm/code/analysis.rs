//! Derive `max_stack` and `max_locals` from the instructions themselves

use crate::jvm::class_file::{ConstantsPool, StackMapFrame, VerificationType};
use crate::jvm::code::{Code, CodeAttribute, InsnId, Instruction, Layout};
use crate::jvm::Error;
use crate::util::Width;
use std::collections::HashMap;

/// Largest operand stack depth reached on any path through the code
///
/// Every reachable instruction must always be reached with the same stack depth. Exception
/// handlers start with just the exception on the stack, and a subroutine called with `jsr` starts
/// with its return address on top of the caller's stack.
pub(crate) fn max_stack(
    code: &Code,
    layout: &Layout,
    constants: &ConstantsPool,
) -> Result<usize, Error> {
    let order: Vec<(InsnId, &Instruction<InsnId>)> = code.instructions.iter().collect();
    let positions: HashMap<InsnId, usize> = order
        .iter()
        .enumerate()
        .map(|(position, (id, _))| (*id, position))
        .collect();
    let position_of = |id: &InsnId| positions.get(id).copied().ok_or(Error::UnplacedInstruction);

    let mut depths: Vec<Option<usize>> = vec![None; order.len()];
    let mut worklist: Vec<(usize, usize)> = vec![];
    if !order.is_empty() {
        worklist.push((0, 0));
    }
    for range in &code.exception_table {
        worklist.push((position_of(&range.handler)?, 1));
    }

    let mut max_stack = 0;
    while let Some((position, depth)) = worklist.pop() {
        let (id, insn) = order[position];
        match depths[position] {
            Some(seen) if seen == depth => continue,
            Some(seen) => {
                return Err(Error::InconsistentStackDepth {
                    offset: layout.offset(id)?,
                    first: seen,
                    second: depth,
                })
            }
            None => depths[position] = Some(depth),
        }

        let effect = insn.stack_effect(constants)?;
        if effect.pops > depth {
            return Err(Error::StackUnderflow {
                offset: layout.offset(id)?,
            });
        }
        let after = depth - effect.pops + effect.pushes;
        max_stack = max_stack.max(depth).max(after);

        let next = position + 1;
        if insn.is_subroutine_call() {
            max_stack = max_stack.max(after + 1);
            for target in insn.jump_targets() {
                worklist.push((position_of(target)?, after + 1));
            }
            if next < order.len() {
                worklist.push((next, depth));
            }
        } else {
            for target in insn.jump_targets() {
                worklist.push((position_of(target)?, after));
            }
            if insn.falls_through() && next < order.len() {
                worklist.push((next, after));
            }
        }
    }

    Ok(max_stack)
}

/// Number of local variable slots needed
///
/// This covers the parameters, every slot read or written by an instruction, every local in a
/// stack map frame, and every entry in the local variable tables.
pub(crate) fn max_locals(code: &Code, constants: &ConstantsPool) -> Result<usize, Error> {
    let mut max_locals = code.signature.parameter_slots();

    for (_, insn) in code.instructions.iter() {
        if let Some(extent) = insn.locals_extent() {
            max_locals = max_locals.max(extent);
        }
    }

    for attribute in &code.attributes {
        match attribute {
            CodeAttribute::LocalVariables(ranges) | CodeAttribute::LocalVariableTypes(ranges) => {
                for range in ranges {
                    // Only `long` and `double` take two slots, and neither can be generic
                    let descriptor = constants.lookup_utf8(range.descriptor)?;
                    let width = if descriptor == "J" || descriptor == "D" {
                        2
                    } else {
                        1
                    };
                    max_locals = max_locals.max(range.index as usize + width);
                }
            }
            CodeAttribute::StackMap(frames) => {
                max_locals = max_locals.max(max_frame_locals(code, frames));
            }
            _ => (),
        }
    }

    Ok(max_locals)
}

/// Widest locals of any frame, tracking the frames as deltas off of the implicit initial frame
fn max_frame_locals(code: &Code, frames: &[(InsnId, StackMapFrame<InsnId>)]) -> usize {
    let mut locals: Vec<usize> = vec![];
    if !code.signature.is_static {
        locals.push(1);
    }
    locals.extend(code.signature.descriptor.parameters.iter().map(|p| p.width()));

    let slots = |locals: &[usize]| locals.iter().sum::<usize>();
    let widths = |types: &[VerificationType<InsnId>]| -> Vec<usize> {
        types.iter().map(|typ| typ.width()).collect()
    };

    let mut max_locals = slots(&locals);
    for (_, frame) in frames {
        match frame {
            StackMapFrame::SameLocalsNoStack { .. } | StackMapFrame::SameLocalsOneStack { .. } => (),
            StackMapFrame::ChopLocalsNoStack { chopped_k, .. } => {
                let keep = locals.len().saturating_sub(*chopped_k as usize);
                locals.truncate(keep);
            }
            StackMapFrame::AppendLocalsNoStack {
                locals: appended, ..
            } => locals.extend(widths(appended)),
            StackMapFrame::Full {
                locals: replaced, ..
            } => locals = widths(replaced),
        }
        max_locals = max_locals.max(slots(&locals));
    }
    max_locals
}

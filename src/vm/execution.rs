//! VM instruction execution logic
//!
//! Opcode handlers are pure: each takes the memory and register file by
//! shared reference and describes its effect as an [`Effect`] value. The
//! driver in `vm.rs` applies effects, which keeps every instruction atomic
//! (a fault leaves state exactly as it was before the instruction) and lets
//! each opcode be tested in isolation.

use crate::vm::errors::DecodeError;
use crate::vm::memory::Memory;
use crate::vm::types::{Instruction, Mode, Opcode, Registers};

/// What the driver should do after applying an effect
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    /// Keep dispatching
    Continue,

    /// The instruction needs an input value that was not supplied; nothing
    /// else in the effect is meaningful and pc stays put
    NeedInput,

    /// Opcode 99 reached
    Halt,
}

/// The complete outcome of executing one instruction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Effect {
    /// Cell to store, applied last
    pub write: Option<(usize, i64)>,

    /// Register file after the instruction
    pub registers: Registers,

    /// Value appended to the output log
    pub output: Option<i64>,

    /// Whether the supplied input value was used
    pub consumed_input: bool,

    pub control: Control,
}

impl Effect {
    fn advance(registers: &Registers, instr: &Instruction) -> Result<Self, DecodeError> {
        let pc = registers
            .pc
            .checked_add(instr.width())
            .ok_or(DecodeError::Overflow)?;
        Ok(Self {
            write: None,
            registers: Registers { pc, ..*registers },
            output: None,
            consumed_input: false,
            control: Control::Continue,
        })
    }

    fn stay(registers: &Registers, control: Control) -> Self {
        Self {
            write: None,
            registers: *registers,
            output: None,
            consumed_input: false,
            control,
        }
    }
}

/// Decode the instruction at the program counter
pub fn fetch(memory: &Memory, registers: &Registers) -> Result<Instruction, DecodeError> {
    Instruction::decode(memory.get(registers.pc))
}

/// Resolves parameters of one instruction against memory and registers
struct Operands<'a> {
    memory: &'a Memory,
    registers: &'a Registers,
    instr: &'a Instruction,
}

impl<'a> Operands<'a> {
    fn raw(&self, param: usize) -> Result<i64, DecodeError> {
        let addr = self
            .registers
            .pc
            .checked_add(param)
            .ok_or(DecodeError::Overflow)?;
        Ok(self.memory.get(addr))
    }

    fn relative(&self, raw: i64) -> Result<i64, DecodeError> {
        raw.checked_add(self.registers.relative_base)
            .ok_or(DecodeError::Overflow)
    }

    /// Value of a read parameter
    fn read(&self, param: usize) -> Result<i64, DecodeError> {
        let raw = self.raw(param)?;
        match self.instr.mode(param) {
            Mode::Immediate => Ok(raw),
            Mode::Position => Ok(self.memory.get(address(raw)?)),
            Mode::Relative => Ok(self.memory.get(address(self.relative(raw)?)?)),
        }
    }

    /// Address of a write parameter
    fn target(&self, param: usize) -> Result<usize, DecodeError> {
        let raw = self.raw(param)?;
        match self.instr.mode(param) {
            Mode::Position => address(raw),
            Mode::Relative => address(self.relative(raw)?),
            Mode::Immediate => Err(DecodeError::ImmediateWrite { param }),
        }
    }
}

fn address(value: i64) -> Result<usize, DecodeError> {
    usize::try_from(value).map_err(|_| DecodeError::NegativeAddress(value))
}

/// Execute one decoded instruction
///
/// `input` is the value an `Input` instruction would consume, if one is
/// available. No state is modified here.
pub fn execute(
    instr: &Instruction,
    memory: &Memory,
    registers: &Registers,
    input: Option<i64>,
) -> Result<Effect, DecodeError> {
    let ops = Operands {
        memory,
        registers,
        instr,
    };

    match instr.opcode {
        Opcode::Add => binary(&ops, |a, b| a.checked_add(b).ok_or(DecodeError::Overflow)),
        Opcode::Multiply => binary(&ops, |a, b| a.checked_mul(b).ok_or(DecodeError::Overflow)),
        Opcode::LessThan => binary(&ops, |a, b| Ok((a < b) as i64)),
        Opcode::Equals => binary(&ops, |a, b| Ok((a == b) as i64)),

        Opcode::Input => {
            let dst = ops.target(1)?;
            match input {
                Some(value) => {
                    let mut effect = Effect::advance(registers, instr)?;
                    effect.write = Some((dst, value));
                    effect.consumed_input = true;
                    Ok(effect)
                }
                None => Ok(Effect::stay(registers, Control::NeedInput)),
            }
        }

        Opcode::Output => {
            let value = ops.read(1)?;
            let mut effect = Effect::advance(registers, instr)?;
            effect.output = Some(value);
            Ok(effect)
        }

        Opcode::JumpIfTrue => jump(&ops, |v| v != 0),
        Opcode::JumpIfFalse => jump(&ops, |v| v == 0),

        Opcode::AdjustBase => {
            let delta = ops.read(1)?;
            let mut effect = Effect::advance(registers, instr)?;
            effect.registers.relative_base = registers
                .relative_base
                .checked_add(delta)
                .ok_or(DecodeError::Overflow)?;
            Ok(effect)
        }

        Opcode::Halt => Ok(Effect::stay(registers, Control::Halt)),
    }
}

/// Three-operand instruction storing `f(a, b)` through parameter 3
fn binary<F>(ops: &Operands<'_>, f: F) -> Result<Effect, DecodeError>
where
    F: FnOnce(i64, i64) -> Result<i64, DecodeError>,
{
    let a = ops.read(1)?;
    let b = ops.read(2)?;
    let dst = ops.target(3)?;
    let mut effect = Effect::advance(ops.registers, ops.instr)?;
    effect.write = Some((dst, f(a, b)?));
    Ok(effect)
}

fn jump<F>(ops: &Operands<'_>, taken: F) -> Result<Effect, DecodeError>
where
    F: FnOnce(i64) -> bool,
{
    let cond = ops.read(1)?;
    let target = ops.read(2)?;
    let mut effect = Effect::advance(ops.registers, ops.instr)?;
    if taken(cond) {
        effect.registers.pc = address(target)?;
    }
    Ok(effect)
}

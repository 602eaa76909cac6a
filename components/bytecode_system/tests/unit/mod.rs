//! Unit tests for bytecode_system

mod test_chunk;
mod test_constant_pool;
mod test_opcode;

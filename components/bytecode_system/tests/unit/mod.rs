//! Unit tests for bytecode_system

mod test_assembler;
mod test_stream;

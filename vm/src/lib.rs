pub mod disasm;
pub mod error;
pub mod function;
pub mod globals;
pub mod guarded;
pub mod machine;
pub mod native;
pub mod opcode;
pub mod stdlib;
pub mod value;

pub use error::RuntimeError;
pub use function::{Closure, FunctionProto, UpvalueSource};
pub use globals::{CapabilityTable, CapabilityTableBuilder, Environment, GlobalEntry};
pub use guarded::{guarded_get, guarded_iter};
pub use machine::{CallFrame, VM};
pub use native::{NativeFn, NativeObj};
pub use opcode::OpCode;
pub use value::{HostObject, ListCell, MapCell, Module, Value};

use std::sync::Arc;

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::RuntimeError;
use crate::machine::VM;
use crate::native::{arg_f64, arg_int, expect_args, NativeObj};
use crate::value::{Module, Value};

/// The `random` module, backed by one seedable generator shared by every
/// guest thread.
pub fn module(seed: Option<u64>) -> Value {
    let rng = Arc::new(Mutex::new(match seed {
        Some(s) => StdRng::seed_from_u64(s),
        None => StdRng::from_entropy(),
    }));

    let r = rng.clone();
    let random = NativeObj::value("random", 0, move |_vm: &mut VM, _args: &[Value]| {
        Ok(Value::Float(r.lock().gen::<f64>()))
    });

    let r = rng.clone();
    let randint = NativeObj::value("randint", 2, move |_vm: &mut VM, args: &[Value]| {
        expect_args("randint", args, 2)?;
        let lo = arg_int("randint", &args[0])?;
        let hi = arg_int("randint", &args[1])?;
        if lo > hi {
            return Err(RuntimeError::TypeMismatch(format!(
                "randint() empty range {lo}..={hi}"
            )));
        }
        Ok(Value::Int(r.lock().gen_range(lo..=hi)))
    });

    let r = rng.clone();
    let uniform = NativeObj::value("uniform", 2, move |_vm: &mut VM, args: &[Value]| {
        expect_args("uniform", args, 2)?;
        let a = arg_f64("uniform", &args[0])?;
        let b = arg_f64("uniform", &args[1])?;
        let t: f64 = r.lock().gen();
        Ok(Value::Float(a + (b - a) * t))
    });

    let r = rng.clone();
    let choice = NativeObj::value("choice", 1, move |_vm: &mut VM, args: &[Value]| {
        expect_args("choice", args, 1)?;
        let items = args[0].list_snapshot().unwrap_or_default();
        if items.is_empty() {
            return Ok(Value::Nil);
        }
        let idx = r.lock().gen_range(0..items.len());
        Ok(items[idx].clone())
    });

    let r = rng;
    let seed_fn = NativeObj::value("seed", 1, move |_vm: &mut VM, args: &[Value]| {
        expect_args("seed", args, 1)?;
        let s = arg_int("seed", &args[0])?;
        *r.lock() = StdRng::seed_from_u64(s as u64);
        Ok(Value::Nil)
    });

    let m = Module::new("random")
        .with("random", random)
        .with("randint", randint)
        .with("uniform", uniform)
        .with("choice", choice)
        .with("seed", seed_fn);
    Value::Module(Arc::new(m))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::globals::{CapabilityTableBuilder, Environment};

    fn member(m: &Value, name: &str) -> Value {
        match m {
            Value::Module(m) => m.members.get(name).cloned().unwrap(),
            _ => panic!("not a module"),
        }
    }

    fn vm() -> VM {
        VM::new(Environment::new(CapabilityTableBuilder::new().build()))
    }

    #[test]
    fn seeded_sequences_repeat() {
        let m = module(Some(7));
        let mut vm = vm();
        let randint = member(&m, "randint");
        let args = [Value::Int(0), Value::Int(1000)];
        let first: Vec<i64> = (0..5)
            .map(|_| vm.call(&randint, &args).unwrap().as_int().unwrap())
            .collect();
        vm.call(&member(&m, "seed"), &[Value::Int(7)]).unwrap();
        let second: Vec<i64> = (0..5)
            .map(|_| vm.call(&randint, &args).unwrap().as_int().unwrap())
            .collect();
        assert_eq!(first, second);
        assert!(first.iter().all(|n| (0..=1000).contains(n)));
    }

    #[test]
    fn choice_on_empty_or_non_list_is_nil() {
        let m = module(Some(1));
        let mut vm = vm();
        let choice = member(&m, "choice");
        assert!(vm.call(&choice, &[Value::list(vec![])]).unwrap().is_nil());
        assert!(vm.call(&choice, &[Value::Int(3)]).unwrap().is_nil());
        let one = vm.call(&choice, &[Value::list(vec![Value::Int(9)])]).unwrap();
        assert!(one.equals(&Value::Int(9)));
    }

    #[test]
    fn random_is_in_unit_interval() {
        let m = module(None);
        let mut vm = vm();
        let random = member(&m, "random");
        for _ in 0..100 {
            let Value::Float(f) = vm.call(&random, &[]).unwrap() else {
                panic!("random() returns a float")
            };
            assert!((0.0..1.0).contains(&f));
        }
    }
}

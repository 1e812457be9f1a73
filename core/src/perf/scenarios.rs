use std::sync::Arc;

use anyhow::{Context, Result, anyhow};

use crate::ir::{FuncBuilder, FuncId, InsnCode, ItemRef, Mem, Module, Operand, Proto, Type, Var};
use crate::vm::{Interp, InterpConfig, Slot};

/// Named demo program with a native reference implementation.
pub struct Scenario {
    pub key: &'static str,
    pub title: &'static str,
    pub entry: &'static str,
    pub arity: usize,
    pub default_args: &'static [i64],
    build: fn() -> Module,
    install: Option<fn(&mut Interp)>,
    reference: fn(&[i64]) -> i64,
}

impl Scenario {
    pub fn module(&self) -> Module {
        (self.build)()
    }

    /// Expected result for `args`, computed natively.
    pub fn reference(&self, args: &[i64]) -> i64 {
        (self.reference)(args)
    }

    pub fn prepare(&'static self, config: InterpConfig) -> Result<PreparedScenario> {
        let module = self.module();
        let entry = module
            .find_func(self.entry)
            .ok_or_else(|| anyhow!("scenario {} has no function '{}'", self.key, self.entry))?;
        let mut interp = Interp::with_config(module, config)?;
        if let Some(install) = self.install {
            install(&mut interp);
        }
        Ok(PreparedScenario {
            spec: self,
            interp,
            entry,
        })
    }
}

/// Scenario bound to a live context; repeated runs share compiled code and caches.
pub struct PreparedScenario {
    spec: &'static Scenario,
    interp: Interp,
    entry: FuncId,
}

impl PreparedScenario {
    pub fn key(&self) -> &'static str {
        self.spec.key
    }

    pub fn interp(&self) -> &Interp {
        &self.interp
    }

    pub fn entry(&self) -> FuncId {
        self.entry
    }

    pub fn run(&mut self, args: &[i64]) -> Result<i64> {
        if args.len() != self.spec.arity {
            return Err(anyhow!(
                "{} takes {} arguments, got {}",
                self.spec.key,
                self.spec.arity,
                args.len()
            ));
        }
        let slots: Vec<Slot> = args.iter().copied().map(Slot::from_i64).collect();
        let out = self
            .interp
            .interp(self.entry, &slots)
            .with_context(|| format!("interpreting scenario {}", self.spec.key))?;
        Ok(out.first().map(|s| s.i()).unwrap_or_default())
    }
}

static SCENARIOS: &[Scenario] = &[
    Scenario {
        key: "add",
        title: "Two-argument integer add",
        entry: "add",
        arity: 2,
        default_args: &[3, 4],
        build: add_module,
        install: None,
        reference: |a| a[0].wrapping_add(a[1]),
    },
    Scenario {
        key: "fib",
        title: "Recursive Fibonacci through immediate calls",
        entry: "fib",
        arity: 1,
        default_args: &[20],
        build: fib_module,
        install: None,
        reference: |a| {
            let (mut x, mut y) = (0i64, 1i64);
            for _ in 0..a[0].max(0) {
                (x, y) = (y, x.wrapping_add(y));
            }
            x
        },
    },
    Scenario {
        key: "sum_to",
        title: "Counting loop with compare-and-branch",
        entry: "sum_to",
        arity: 1,
        default_args: &[1000],
        build: sum_to_module,
        install: None,
        reference: |a| (1..=a[0]).fold(0i64, |acc, i| acc.wrapping_add(i)),
    },
    Scenario {
        key: "checked_add",
        title: "Signed overflow detection",
        entry: "checked_add",
        arity: 2,
        default_args: &[i64::MAX, 1],
        build: checked_add_module,
        install: None,
        reference: |a| a[0].checked_add(a[1]).is_none() as i64,
    },
    Scenario {
        key: "sum_squares",
        title: "Loop calling a host function through the interface cache",
        entry: "sum_squares",
        arity: 1,
        default_args: &[100],
        build: sum_squares_module,
        install: Some(install_square),
        reference: |a| (1..=a[0]).fold(0i64, |acc, i| acc.wrapping_add(i.wrapping_mul(i))),
    },
    Scenario {
        key: "varsum",
        title: "Variadic callee reading its arguments with va_arg",
        entry: "main",
        arity: 3,
        default_args: &[1, 2, 3],
        build: varsum_module,
        install: None,
        reference: |a| a.iter().fold(0i64, |acc, v| acc.wrapping_add(*v)),
    },
];

pub fn all() -> &'static [Scenario] {
    SCENARIOS
}

pub fn find(key: &str) -> Option<&'static Scenario> {
    SCENARIOS.iter().find(|s| s.key == key)
}

fn i64_var(name: &str) -> Var {
    Var::new(name, Type::I64)
}

fn add_module() -> Module {
    let mut m = Module::new("add");
    let mut b = FuncBuilder::new("add", vec![Type::I64], vec![i64_var("a"), i64_var("b")]);
    let (a, bb) = (b.arg(0), b.arg(1));
    let r = b.reg("r", Type::I64);
    b.binop(InsnCode::Add, r, a, bb).ret(&[r]);
    m.add_func(b.finish());
    m
}

fn fib_module() -> Module {
    let mut m = Module::new("fib");
    let proto = m.add_proto(Proto::new("fib_p", vec![Type::I64], vec![i64_var("n")], false));
    let mut b = FuncBuilder::new("fib", vec![Type::I64], vec![i64_var("n")]);
    let n = b.arg(0);
    let two = b.reg("two", Type::I64);
    let one = b.reg("one", Type::I64);
    let t = b.reg("t", Type::I64);
    let x = b.reg("x", Type::I64);
    let y = b.reg("y", Type::I64);
    let recurse = b.new_label();
    let this = ItemRef::Func(FuncId(0));
    b.mov_i(two, 2).branch(InsnCode::Bge, recurse, n, two).ret(&[n]);
    b.bind(recurse)
        .mov_i(one, 1)
        .binop(InsnCode::Sub, t, n, one)
        .call(proto, this, &[x], &[t.into()])
        .binop(InsnCode::Sub, t, n, two)
        .call(proto, this, &[y], &[t.into()])
        .binop(InsnCode::Add, x, x, y)
        .ret(&[x]);
    m.add_func(b.finish());
    m
}

fn sum_to_module() -> Module {
    let mut m = Module::new("sum_to");
    let mut b = FuncBuilder::new("sum_to", vec![Type::I64], vec![i64_var("n")]);
    let n = b.arg(0);
    let acc = b.reg("acc", Type::I64);
    let i = b.reg("i", Type::I64);
    let one = b.reg("one", Type::I64);
    let (head, done) = (b.new_label(), b.new_label());
    b.mov_i(acc, 0).mov_i(i, 1).mov_i(one, 1);
    b.bind(head)
        .branch(InsnCode::Bgt, done, i, n)
        .binop(InsnCode::Add, acc, acc, i)
        .binop(InsnCode::Add, i, i, one)
        .jmp(head);
    b.bind(done).ret(&[acc]);
    m.add_func(b.finish());
    m
}

fn checked_add_module() -> Module {
    let mut m = Module::new("checked_add");
    let mut b = FuncBuilder::new("checked_add", vec![Type::I64], vec![i64_var("a"), i64_var("b")]);
    let (a, bb) = (b.arg(0), b.arg(1));
    let r = b.reg("r", Type::I64);
    let flag = b.reg("flag", Type::I64);
    let overflow = b.new_label();
    b.binop(InsnCode::AddO, r, a, bb)
        .emit(InsnCode::Bo, [Operand::Label(overflow)])
        .mov_i(flag, 0)
        .ret(&[flag]);
    b.bind(overflow).mov_i(flag, 1).ret(&[flag]);
    m.add_func(b.finish());
    m
}

fn sum_squares_module() -> Module {
    let mut m = Module::new("sum_squares");
    let square = m.add_import("square");
    let proto = m.add_proto(Proto::new("square_p", vec![Type::I64], vec![i64_var("x")], false));
    let mut b = FuncBuilder::new("sum_squares", vec![Type::I64], vec![i64_var("n")]);
    let n = b.arg(0);
    let acc = b.reg("acc", Type::I64);
    let i = b.reg("i", Type::I64);
    let one = b.reg("one", Type::I64);
    let sq = b.reg("sq", Type::I64);
    let (head, done) = (b.new_label(), b.new_label());
    b.mov_i(acc, 0).mov_i(i, 1).mov_i(one, 1);
    b.bind(head)
        .branch(InsnCode::Bgt, done, i, n)
        .call(proto, ItemRef::Import(square), &[sq], &[i.into()])
        .binop(InsnCode::Add, acc, acc, sq)
        .binop(InsnCode::Add, i, i, one)
        .jmp(head);
    b.bind(done).ret(&[acc]);
    m.add_func(b.finish());
    m
}

fn install_square(interp: &mut Interp) {
    interp.register_host(
        "square",
        1,
        Arc::new(|_: &mut Interp, args: &[Slot], res: &mut [Slot]| {
            let x = args[0].i();
            res[0] = Slot::from_i64(x.wrapping_mul(x));
            Ok(())
        }),
    );
}

fn varsum_module() -> Module {
    let mut m = Module::new("varsum");
    let proto = m.add_proto(Proto::new("vsum_p", vec![Type::I64], vec![i64_var("n")], true));

    let mut b = FuncBuilder::new_vararg("vsum", vec![Type::I64], vec![i64_var("n")]);
    let n = b.arg(0);
    let va = b.reg("va", Type::P);
    let size = b.reg("size", Type::I64);
    let acc = b.reg("acc", Type::I64);
    let i = b.reg("i", Type::I64);
    let one = b.reg("one", Type::I64);
    let p = b.reg("p", Type::P);
    let v = b.reg("v", Type::I64);
    let (head, done) = (b.new_label(), b.new_label());
    b.mov_i(size, 16)
        .emit(InsnCode::Alloca, [Operand::Reg(va), Operand::Reg(size)])
        .emit(InsnCode::VaStart, [Operand::Reg(va)])
        .mov_i(acc, 0)
        .mov_i(i, 0)
        .mov_i(one, 1);
    b.bind(head)
        .branch(InsnCode::Bge, done, i, n)
        .emit(InsnCode::VaArg, [Operand::Reg(p), Operand::Reg(va), Operand::Mem(Mem::base(Type::I64, va))])
        .load(Type::I64, v, p)
        .binop(InsnCode::Add, acc, acc, v)
        .binop(InsnCode::Add, i, i, one)
        .jmp(head);
    b.bind(done).emit(InsnCode::VaEnd, [Operand::Reg(va)]).ret(&[acc]);
    let vsum = m.add_func(b.finish());

    let mut b = FuncBuilder::new("main", vec![Type::I64], vec![i64_var("a"), i64_var("b"), i64_var("c")]);
    let args = [b.arg(0), b.arg(1), b.arg(2)];
    let count = b.reg("count", Type::I64);
    let r = b.reg("r", Type::I64);
    b.mov_i(count, 3)
        .call(
            proto,
            ItemRef::Func(vsum),
            &[r],
            &[count.into(), args[0].into(), args[1].into(), args[2].into()],
        )
        .ret(&[r]);
    m.add_func(b.finish());
    m
}

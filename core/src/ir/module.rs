use std::fmt;

use super::func::Func;
use super::types::Type;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FuncId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProtoId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ImportId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DataId(pub u32);

/// Reference to a module item from an instruction operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemRef {
    Func(FuncId),
    Proto(ProtoId),
    Import(ImportId),
    Data(DataId),
}

impl fmt::Display for ItemRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemRef::Func(id) => write!(f, "@func{}", id.0),
            ItemRef::Proto(id) => write!(f, "@proto{}", id.0),
            ItemRef::Import(id) => write!(f, "@import{}", id.0),
            ItemRef::Data(id) => write!(f, "@data{}", id.0),
        }
    }
}

/// Named, typed variable: a function argument or a prototype parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct Var {
    pub name: String,
    pub ty: Type,
    /// Byte size for block types, 0 otherwise.
    pub size: u64,
}

impl Var {
    pub fn new(name: impl Into<String>, ty: Type) -> Self {
        Self {
            name: name.into(),
            ty,
            size: 0,
        }
    }

    pub fn block(name: impl Into<String>, ty: Type, size: u64) -> Self {
        debug_assert!(ty.is_blk());
        Self {
            name: name.into(),
            ty,
            size,
        }
    }
}

/// Call prototype: the signature a call instruction is made through.
#[derive(Debug, Clone, PartialEq)]
pub struct Proto {
    pub name: String,
    pub res_types: Vec<Type>,
    pub args: Vec<Var>,
    pub vararg: bool,
}

impl Proto {
    pub fn new(name: impl Into<String>, res_types: Vec<Type>, args: Vec<Var>, vararg: bool) -> Self {
        Self {
            name: name.into(),
            res_types,
            args,
            vararg,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Import {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataItem {
    pub name: String,
    pub bytes: Vec<u8>,
}

/// A unit of functions, prototypes, imports and data handed to the interpreter.
#[derive(Debug, Clone, Default)]
pub struct Module {
    pub name: String,
    funcs: Vec<Func>,
    protos: Vec<Proto>,
    imports: Vec<Import>,
    data: Vec<DataItem>,
}

impl Module {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn add_func(&mut self, func: Func) -> FuncId {
        self.funcs.push(func);
        FuncId(self.funcs.len() as u32 - 1)
    }

    pub fn add_proto(&mut self, proto: Proto) -> ProtoId {
        self.protos.push(proto);
        ProtoId(self.protos.len() as u32 - 1)
    }

    pub fn add_import(&mut self, name: impl Into<String>) -> ImportId {
        let name = name.into();
        if let Some(idx) = self.imports.iter().position(|i| i.name == name) {
            return ImportId(idx as u32);
        }
        self.imports.push(Import { name });
        ImportId(self.imports.len() as u32 - 1)
    }

    pub fn add_data(&mut self, name: impl Into<String>, bytes: Vec<u8>) -> DataId {
        self.data.push(DataItem {
            name: name.into(),
            bytes,
        });
        DataId(self.data.len() as u32 - 1)
    }

    pub fn func(&self, id: FuncId) -> Option<&Func> {
        self.funcs.get(id.0 as usize)
    }

    pub fn func_mut(&mut self, id: FuncId) -> Option<&mut Func> {
        self.funcs.get_mut(id.0 as usize)
    }

    pub fn proto(&self, id: ProtoId) -> Option<&Proto> {
        self.protos.get(id.0 as usize)
    }

    pub fn import(&self, id: ImportId) -> Option<&Import> {
        self.imports.get(id.0 as usize)
    }

    pub fn data(&self) -> &[DataItem] {
        &self.data
    }

    pub fn find_func(&self, name: &str) -> Option<FuncId> {
        self.funcs
            .iter()
            .position(|f| f.name() == name)
            .map(|idx| FuncId(idx as u32))
    }

    pub fn func_ids(&self) -> impl Iterator<Item = FuncId> + '_ {
        (0..self.funcs.len()).map(|idx| FuncId(idx as u32))
    }
}

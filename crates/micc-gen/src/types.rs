//! Type mapping from source types to LLVM IR types.

use inkwell::context::Context;
use inkwell::types::{BasicMetadataTypeEnum, BasicType, BasicTypeEnum};
use inkwell::values::BasicValueEnum;
use micc_par::{FunctionType, Type};

use crate::error::{CodeGenError, Result};

/// Maps source-level [`Type`]s onto LLVM types.
///
/// `long` and `long long` share `i64`; `double` and `long double` share
/// `f64`. The ranks stay distinct at the source level — only the storage
/// collapses.
pub struct TypeMapper<'ctx> {
    pub context: &'ctx Context,
}

impl<'ctx> TypeMapper<'ctx> {
    pub fn new(context: &'ctx Context) -> Self {
        Self { context }
    }

    /// Map a scalar type to an LLVM value type.
    ///
    /// `void` and function types have no value representation and produce
    /// a backend error; callers reject those before asking.
    pub fn basic_type(&self, ty: &Type) -> Result<BasicTypeEnum<'ctx>> {
        let mapped: BasicTypeEnum<'ctx> = match ty {
            Type::Char => self.context.i8_type().into(),
            Type::Short => self.context.i16_type().into(),
            Type::Int => self.context.i32_type().into(),
            Type::Long | Type::LongLong => self.context.i64_type().into(),
            Type::Float => self.context.f32_type().into(),
            Type::Double | Type::LongDouble => self.context.f64_type().into(),
            Type::Void | Type::Function(_) => {
                return Err(CodeGenError::Backend(format!(
                    "type {:?} has no value representation",
                    ty
                )));
            }
        };

        Ok(mapped)
    }

    /// Build an LLVM function type from a source signature.
    pub fn function_type(
        &self,
        signature: &FunctionType,
    ) -> Result<inkwell::types::FunctionType<'ctx>> {
        let mut parameters: Vec<BasicMetadataTypeEnum<'ctx>> = Vec::new();

        for parameter in &signature.parameters {
            parameters.push(self.basic_type(parameter)?.into());
        }

        let function_type = if signature.return_type == Type::Void {
            self.context
                .void_type()
                .fn_type(&parameters, signature.variadic)
        } else {
            self.basic_type(&signature.return_type)?
                .fn_type(&parameters, signature.variadic)
        };

        Ok(function_type)
    }

    /// The default value of a scalar: a zero integer or `0.0`.
    pub fn default_value(&self, ty: &Type) -> Result<BasicValueEnum<'ctx>> {
        let value: BasicValueEnum<'ctx> = match self.basic_type(ty)? {
            BasicTypeEnum::IntType(int_type) => int_type.const_int(0, false).into(),
            BasicTypeEnum::FloatType(float_type) => float_type.const_float(0.0).into(),
            other => {
                return Err(CodeGenError::Backend(format!(
                    "no default value for {:?}",
                    other
                )));
            }
        };

        Ok(value)
    }
}

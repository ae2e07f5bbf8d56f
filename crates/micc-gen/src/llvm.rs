//! The AST-to-LLVM walker.
//!
//! One [`CodeGen`] compiles one translation unit. Declarations are emitted
//! in parse order; name visibility is single-pass, so a symbol must be
//! registered before the declaration that mentions it.
//!
//! Numeric coercion happens in two layers. Constant subtrees are folded at
//! compile time: [`CodeGen::cast_constant`] rewrites literals to the
//! destination type and the folder collapses literal-only arithmetic into
//! a single constant, so a global initializer never needs a builder
//! instruction. Everything else is coerced at runtime by
//! [`CodeGen::cast_value`], which picks the cast instruction by the rank
//! direction of the types involved — `Float` is the integer/floating
//! boundary.

use std::path::Path;

use inkwell::builder::Builder;
use inkwell::context::Context;
use inkwell::module::Module;
use inkwell::targets::{
    CodeModel, FileType, InitializationConfig, RelocMode, Target, TargetMachine,
};
use inkwell::types::BasicTypeEnum;
use inkwell::values::{BasicMetadataValueEnum, BasicValueEnum, FunctionValue};
use inkwell::OptimizationLevel;

use micc_par::{
    BinaryOp, Declaration, Expr, ExprKind, Function, Root, Stmt, StmtKind, Type, UnaryOp, Variable,
};
use micc_util::Diagnostic;

use crate::error::{CodeGenError, Result};
use crate::symbol_table::{Symbol, SymbolLinkage, SymbolTable, SymbolValue};
use crate::types::TypeMapper;

/// State for the function body currently being emitted.
struct CurrentFunction {
    return_type: Type,
    /// Set by any `return` statement; when still false after the body, a
    /// terminator is synthesized.
    returned: bool,
}

/// A literal-only subtree collapsed to a single value.
enum Folded {
    Int(u64),
    Float(f64),
}

/// Drives the LLVM builder over a parsed [`Root`].
pub struct CodeGen<'ctx> {
    context: &'ctx Context,
    pub module: Module<'ctx>,
    builder: Builder<'ctx>,
    types: TypeMapper<'ctx>,
    symbol_table: SymbolTable<'ctx>,
    current_function: Option<CurrentFunction>,
}

impl<'ctx> CodeGen<'ctx> {
    pub fn new(context: &'ctx Context, source_file_path: &str) -> Self {
        let module = context.create_module(source_file_path);
        module.set_source_file_name(source_file_path);

        Self {
            context,
            module,
            builder: context.create_builder(),
            types: TypeMapper::new(context),
            symbol_table: SymbolTable::new(),
            current_function: None,
        }
    }

    /// Emit every declaration in parse order.
    pub fn compile_root(&mut self, root: &Root) -> Result<()> {
        for declaration in &root.declarations {
            self.compile_declaration(declaration)?;
        }

        Ok(())
    }

    fn compile_declaration(&mut self, declaration: &Declaration) -> Result<()> {
        match declaration {
            Declaration::Function(function) => self.compile_function(function),
            Declaration::Variable(variable) => {
                self.compile_variable(variable, SymbolLinkage::Global)
            }
        }
    }

    // =========================================================================
    // Type inference
    // =========================================================================

    /// Infer the type an expression evaluates to.
    ///
    /// Literals infer the widest kind on their side of the rank order;
    /// coercion narrows them later if a destination type demands it.
    fn infer_type(&self, expr: &Expr) -> Result<Type> {
        let ty = match &expr.kind {
            ExprKind::Int(_) => Type::LongLong,
            ExprKind::Float(_) => Type::LongDouble,
            ExprKind::Identifier(name) => self.symbol_table.lookup(name)?.ty.clone(),
            ExprKind::Unary { rhs, .. } => self.infer_type(rhs)?,
            ExprKind::Binary { lhs, rhs, .. } => {
                let lhs_type = self.infer_type(lhs)?;
                let rhs_type = self.infer_type(rhs)?;

                if lhs_type.rank() > rhs_type.rank() {
                    lhs_type
                } else {
                    rhs_type
                }
            }
            ExprKind::Call { callee, .. } => match self.infer_type(callee)? {
                Type::Function(signature) => signature.return_type,
                _ => {
                    return Err(Diagnostic::error(callee.loc, "expected a callable").into());
                }
            },
        };

        Ok(ty)
    }

    // =========================================================================
    // Numeric coercion
    // =========================================================================

    /// Rewrite the literals of a constant subtree to the destination type.
    ///
    /// Integer destinations truncate two's-complement; float destinations
    /// round through the destination precision. Identifiers and calls pass
    /// through untouched — they are cast at runtime instead.
    fn cast_constant(dst: &Type, mut expr: Expr) -> Expr {
        match &mut expr.kind {
            ExprKind::Int(value) => match dst {
                Type::Char => *value = (*value as i8) as u64,
                Type::Short => *value = (*value as i16) as u64,
                Type::Int => *value = (*value as i32) as u64,
                Type::Long | Type::LongLong => {}
                Type::Float => {
                    expr.kind = ExprKind::Float((*value as f32) as f64);
                }
                Type::Double | Type::LongDouble => {
                    expr.kind = ExprKind::Float(*value as f64);
                }
                Type::Void | Type::Function(_) => {}
            },

            ExprKind::Float(value) => match dst {
                Type::Char => expr.kind = ExprKind::Int((*value as i8) as u64),
                Type::Short => expr.kind = ExprKind::Int((*value as i16) as u64),
                Type::Int => expr.kind = ExprKind::Int((*value as i32) as u64),
                Type::Long | Type::LongLong => {
                    expr.kind = ExprKind::Int((*value as i64) as u64);
                }
                Type::Float => *value = (*value as f32) as f64,
                Type::Double | Type::LongDouble => {}
                Type::Void | Type::Function(_) => {}
            },

            ExprKind::Unary { rhs, .. } => {
                **rhs = Self::cast_constant(dst, (**rhs).clone());
            }

            ExprKind::Binary { lhs, rhs, .. } => {
                **lhs = Self::cast_constant(dst, (**lhs).clone());
                **rhs = Self::cast_constant(dst, (**rhs).clone());
            }

            ExprKind::Identifier(_) | ExprKind::Call { .. } => {}
        }

        expr
    }

    /// Emit a runtime cast when the backend types differ.
    ///
    /// The instruction follows the rank table: fp→si, si→fp, signed
    /// integer resize, or float precision change.
    fn cast_value(
        &self,
        dst: &Type,
        original: &Type,
        value: BasicValueEnum<'ctx>,
    ) -> Result<BasicValueEnum<'ctx>> {
        let dst_llvm = self.types.basic_type(dst)?;

        if value.get_type() == dst_llvm {
            return Ok(value);
        }

        let casted: BasicValueEnum<'ctx> = match (value, dst_llvm) {
            (BasicValueEnum::FloatValue(value), BasicTypeEnum::IntType(int_type)) => self
                .builder
                .build_float_to_signed_int(value, int_type, "")
                .map_err(CodeGenError::backend)?
                .into(),

            (BasicValueEnum::IntValue(value), BasicTypeEnum::FloatType(float_type)) => self
                .builder
                .build_signed_int_to_float(value, float_type, "")
                .map_err(CodeGenError::backend)?
                .into(),

            (BasicValueEnum::IntValue(value), BasicTypeEnum::IntType(int_type)) => self
                .builder
                .build_int_cast_sign_flag(value, int_type, true, "")
                .map_err(CodeGenError::backend)?
                .into(),

            (BasicValueEnum::FloatValue(value), BasicTypeEnum::FloatType(float_type)) => self
                .builder
                .build_float_cast(value, float_type, "")
                .map_err(CodeGenError::backend)?
                .into(),

            _ => {
                return Err(CodeGenError::Backend(format!(
                    "cannot cast a value of type {:?} to {:?}",
                    original, dst
                )));
            }
        };

        Ok(casted)
    }

    /// Compile `expr` coerced to `dst`.
    ///
    /// When the inferred and destination types agree the expression
    /// compiles as-is; otherwise the constant layer rewrites literal
    /// subtrees first and the runtime layer handles the rest.
    fn compile_and_cast(
        &mut self,
        dst: &Type,
        original: &Type,
        expr: &Expr,
        constant_only: bool,
    ) -> Result<BasicValueEnum<'ctx>> {
        if dst == original {
            self.compile_expr(dst, expr, constant_only)
        } else {
            let casted = Self::cast_constant(dst, expr.clone());
            self.compile_expr(dst, &casted, constant_only)
        }
    }

    // =========================================================================
    // Constant folding
    // =========================================================================

    /// Collapse a literal-only subtree to one value.
    ///
    /// Returns `None` when the subtree mentions an identifier or a call,
    /// or for an integer division by zero (left to the backend).
    /// Arithmetic wraps, matching LLVM constant semantics; a mixed
    /// int/float pair promotes to float.
    fn fold_constant(expr: &Expr) -> Result<Option<Folded>> {
        let folded = match &expr.kind {
            ExprKind::Int(value) => Some(Folded::Int(*value)),
            ExprKind::Float(value) => Some(Folded::Float(*value)),

            ExprKind::Unary { op, rhs } => match Self::fold_constant(rhs)? {
                Some(Folded::Int(value)) => Some(match op {
                    UnaryOp::Minus => Folded::Int(value.wrapping_neg()),
                    UnaryOp::Bang => Folded::Int(!value),
                }),
                Some(Folded::Float(value)) => match op {
                    UnaryOp::Minus => Some(Folded::Float(-value)),
                    UnaryOp::Bang => {
                        return Err(Diagnostic::error(
                            expr.loc,
                            "cannot apply '!' to a floating-point operand",
                        )
                        .into());
                    }
                },
                None => None,
            },

            ExprKind::Binary { lhs, op, rhs } => {
                let (lhs_folded, rhs_folded) =
                    match (Self::fold_constant(lhs)?, Self::fold_constant(rhs)?) {
                        (Some(lhs), Some(rhs)) => (lhs, rhs),
                        _ => return Ok(None),
                    };

                match (lhs_folded, rhs_folded) {
                    (Folded::Int(lhs), Folded::Int(rhs)) => match op {
                        BinaryOp::Plus => Some(Folded::Int(lhs.wrapping_add(rhs))),
                        BinaryOp::Minus => Some(Folded::Int(lhs.wrapping_sub(rhs))),
                        BinaryOp::Star => Some(Folded::Int(lhs.wrapping_mul(rhs))),
                        // Integer division is unsigned here, matching the
                        // udiv the runtime path emits.
                        BinaryOp::Slash => lhs.checked_div(rhs).map(Folded::Int),
                    },
                    (lhs, rhs) => {
                        let lhs = match lhs {
                            Folded::Int(value) => value as f64,
                            Folded::Float(value) => value,
                        };
                        let rhs = match rhs {
                            Folded::Int(value) => value as f64,
                            Folded::Float(value) => value,
                        };

                        Some(Folded::Float(match op {
                            BinaryOp::Plus => lhs + rhs,
                            BinaryOp::Minus => lhs - rhs,
                            BinaryOp::Star => lhs * rhs,
                            BinaryOp::Slash => lhs / rhs,
                        }))
                    }
                }
            }

            ExprKind::Identifier(_) | ExprKind::Call { .. } => None,
        };

        Ok(folded)
    }

    /// Materialize a folded value as a constant of the destination type.
    fn const_value(&self, dst: &Type, folded: Folded) -> Result<BasicValueEnum<'ctx>> {
        let value: BasicValueEnum<'ctx> = match (self.types.basic_type(dst)?, folded) {
            (BasicTypeEnum::IntType(int_type), Folded::Int(value)) => {
                int_type.const_int(value, false).into()
            }
            (BasicTypeEnum::IntType(int_type), Folded::Float(value)) => {
                int_type.const_int((value as i64) as u64, false).into()
            }
            (BasicTypeEnum::FloatType(float_type), Folded::Int(value)) => {
                float_type.const_float(value as f64).into()
            }
            (BasicTypeEnum::FloatType(float_type), Folded::Float(value)) => {
                float_type.const_float(value).into()
            }
            (other, _) => {
                return Err(CodeGenError::Backend(format!(
                    "cannot build a constant of type {:?}",
                    other
                )));
            }
        };

        Ok(value)
    }

    // =========================================================================
    // Expression emission
    // =========================================================================

    /// Compile an expression to a value of type `dst`.
    ///
    /// `constant_only` marks positions that must fold at compile time
    /// (global initializers); identifiers and calls are rejected there.
    fn compile_expr(
        &mut self,
        dst: &Type,
        expr: &Expr,
        constant_only: bool,
    ) -> Result<BasicValueEnum<'ctx>> {
        match &expr.kind {
            ExprKind::Int(value) => self.const_value(dst, Folded::Int(*value)),
            ExprKind::Float(value) => self.const_value(dst, Folded::Float(*value)),

            ExprKind::Identifier(name) => {
                if constant_only {
                    return Err(Diagnostic::error(
                        expr.loc,
                        "expected a constant expression only",
                    )
                    .into());
                }

                let (symbol_type, symbol_value) = {
                    let symbol = self.symbol_table.lookup(name)?;
                    (symbol.ty.clone(), symbol.value)
                };

                match symbol_value {
                    // A function name used as a value is the function
                    // itself.
                    SymbolValue::Function(function) => {
                        Ok(function.as_global_value().as_pointer_value().into())
                    }
                    SymbolValue::Storage(pointer) => {
                        let _pointee = self.types.basic_type(&symbol_type)?;
                        let loaded = self
                            .builder
                            .build_load(pointer, "")
                            .map_err(CodeGenError::backend)?;

                        self.cast_value(dst, &symbol_type, loaded)
                    }
                }
            }

            ExprKind::Unary { op, rhs } => {
                if let Some(folded) = Self::fold_constant(expr)? {
                    return self.const_value(dst, folded);
                }

                let value = self.compile_expr(dst, rhs, constant_only)?;

                let result: BasicValueEnum<'ctx> = match (op, value) {
                    (UnaryOp::Minus, BasicValueEnum::IntValue(value)) => self
                        .builder
                        .build_int_neg(value, "")
                        .map_err(CodeGenError::backend)?
                        .into(),
                    (UnaryOp::Minus, BasicValueEnum::FloatValue(value)) => self
                        .builder
                        .build_float_neg(value, "")
                        .map_err(CodeGenError::backend)?
                        .into(),
                    (UnaryOp::Bang, BasicValueEnum::IntValue(value)) => self
                        .builder
                        .build_not(value, "")
                        .map_err(CodeGenError::backend)?
                        .into(),
                    (UnaryOp::Bang, BasicValueEnum::FloatValue(_)) => {
                        return Err(Diagnostic::error(
                            expr.loc,
                            "cannot apply '!' to a floating-point operand",
                        )
                        .into());
                    }
                    (_, other) => {
                        return Err(CodeGenError::Backend(format!(
                            "unary operand lowered to unexpected value {:?}",
                            other
                        )));
                    }
                };

                Ok(result)
            }

            ExprKind::Binary { lhs, op, rhs } => {
                if let Some(folded) = Self::fold_constant(expr)? {
                    return self.const_value(dst, folded);
                }

                let lhs_value = self.compile_expr(dst, lhs, constant_only)?;
                let rhs_value = self.compile_expr(dst, rhs, constant_only)?;

                self.compile_binary_operation(*op, lhs_value, rhs_value)
            }

            ExprKind::Call { .. } => {
                if constant_only {
                    return Err(Diagnostic::error(
                        expr.loc,
                        "expected a constant expression only",
                    )
                    .into());
                }

                match self.compile_call(dst, expr)? {
                    Some(value) => Ok(value),
                    None => Err(Diagnostic::error(expr.loc, "cannot use a void value").into()),
                }
            }
        }
    }

    fn compile_binary_operation(
        &mut self,
        op: BinaryOp,
        lhs: BasicValueEnum<'ctx>,
        rhs: BasicValueEnum<'ctx>,
    ) -> Result<BasicValueEnum<'ctx>> {
        let result: BasicValueEnum<'ctx> = match (lhs, rhs) {
            (BasicValueEnum::IntValue(lhs), BasicValueEnum::IntValue(rhs)) => match op {
                BinaryOp::Plus => self
                    .builder
                    .build_int_add(lhs, rhs, "")
                    .map_err(CodeGenError::backend)?
                    .into(),
                BinaryOp::Minus => self
                    .builder
                    .build_int_sub(lhs, rhs, "")
                    .map_err(CodeGenError::backend)?
                    .into(),
                BinaryOp::Star => self
                    .builder
                    .build_int_mul(lhs, rhs, "")
                    .map_err(CodeGenError::backend)?
                    .into(),
                BinaryOp::Slash => self
                    .builder
                    .build_int_unsigned_div(lhs, rhs, "")
                    .map_err(CodeGenError::backend)?
                    .into(),
            },

            (BasicValueEnum::FloatValue(lhs), BasicValueEnum::FloatValue(rhs)) => match op {
                BinaryOp::Plus => self
                    .builder
                    .build_float_add(lhs, rhs, "")
                    .map_err(CodeGenError::backend)?
                    .into(),
                BinaryOp::Minus => self
                    .builder
                    .build_float_sub(lhs, rhs, "")
                    .map_err(CodeGenError::backend)?
                    .into(),
                BinaryOp::Star => self
                    .builder
                    .build_float_mul(lhs, rhs, "")
                    .map_err(CodeGenError::backend)?
                    .into(),
                BinaryOp::Slash => self
                    .builder
                    .build_float_div(lhs, rhs, "")
                    .map_err(CodeGenError::backend)?
                    .into(),
            },

            (lhs, rhs) => {
                return Err(CodeGenError::Backend(format!(
                    "binary operands lowered to mismatched values {:?} and {:?}",
                    lhs, rhs
                )));
            }
        };

        Ok(result)
    }

    /// Compile a call expression.
    ///
    /// Returns `None` when the callee returns `void`; expression
    /// statements accept that, value positions do not.
    fn compile_call(&mut self, dst: &Type, expr: &Expr) -> Result<Option<BasicValueEnum<'ctx>>> {
        let ExprKind::Call { callee, args } = &expr.kind else {
            return Err(CodeGenError::Backend(
                "compile_call invoked on a non-call expression".into(),
            ));
        };

        let Type::Function(signature) = self.infer_type(callee)? else {
            return Err(Diagnostic::error(callee.loc, "expected a callable").into());
        };

        let arity_ok = if signature.variadic {
            args.len() >= signature.parameters.len()
        } else {
            args.len() == signature.parameters.len()
        };

        if !arity_ok {
            return Err(Diagnostic::error(
                expr.loc,
                format!(
                    "expected {} arguments got {}",
                    signature.parameters.len(),
                    args.len()
                ),
            )
            .into());
        }

        let function = self.callee_function(callee)?;

        let mut argument_values: Vec<BasicMetadataValueEnum<'ctx>> = Vec::new();

        for (index, arg) in args.iter().enumerate() {
            let original = self.infer_type(arg)?;

            // Arguments coerce to their declared parameter type; extra
            // variadic arguments pass through at their inferred type.
            let expected = signature
                .parameters
                .get(index)
                .cloned()
                .unwrap_or_else(|| original.clone());

            let value = self.compile_and_cast(&expected, &original, arg, false)?;
            argument_values.push(value.into());
        }

        let call_site = self
            .builder
            .build_call(function, &argument_values, "")
            .map_err(CodeGenError::backend)?;

        if signature.return_type == Type::Void {
            return Ok(None);
        }

        let value = call_site.try_as_basic_value().unwrap_basic();

        Ok(Some(self.cast_value(dst, &signature.return_type, value)?))
    }

    /// Resolve the callee expression to the function it names.
    fn callee_function(&self, callee: &Expr) -> Result<FunctionValue<'ctx>> {
        if let ExprKind::Identifier(name) = &callee.kind {
            if let SymbolValue::Function(function) = self.symbol_table.lookup(name)?.value {
                return Ok(function);
            }
        }

        Err(Diagnostic::error(callee.loc, "expected a callable").into())
    }

    // =========================================================================
    // Statement emission
    // =========================================================================

    fn compile_stmt(&mut self, stmt: &Stmt) -> Result<()> {
        match &stmt.kind {
            StmtKind::Return(value) => self.compile_return_stmt(stmt, value.as_ref()),

            StmtKind::VariableDecl(variable) => {
                self.compile_variable(variable, SymbolLinkage::Local)
            }

            StmtKind::Expr(expr) => {
                if matches!(expr.kind, ExprKind::Call { .. }) {
                    let inferred = self.infer_type(expr)?;
                    self.compile_call(&inferred, expr)?;
                } else {
                    Diagnostic::warning(
                        expr.loc,
                        "expression is not used, thus it will not be compiled",
                    )
                    .emit();
                }

                Ok(())
            }
        }
    }

    fn compile_return_stmt(&mut self, stmt: &Stmt, value: Option<&Expr>) -> Result<()> {
        let return_type = match &self.current_function {
            Some(current) => current.return_type.clone(),
            None => {
                return Err(CodeGenError::Backend(
                    "return statement outside a function body".into(),
                ));
            }
        };

        match value {
            None => {
                if return_type != Type::Void {
                    return Err(
                        Diagnostic::error(stmt.loc, "expected non-void return type").into(),
                    );
                }

                self.builder
                    .build_return(None)
                    .map_err(CodeGenError::backend)?;
            }
            Some(expr) => {
                let original = self.infer_type(expr)?;
                let value = self.compile_and_cast(&return_type, &original, expr, false)?;

                self.builder
                    .build_return(Some(&value))
                    .map_err(CodeGenError::backend)?;
            }
        }

        if let Some(current) = &mut self.current_function {
            current.returned = true;
        }

        Ok(())
    }

    // =========================================================================
    // Declaration emission
    // =========================================================================

    /// Emit a variable and register its symbol.
    ///
    /// Globals take a constant initializer (default or folded); locals
    /// take an alloca plus a store, and their initializers may compute.
    fn compile_variable(&mut self, variable: &Variable, linkage: SymbolLinkage) -> Result<()> {
        if variable.ty == Type::Void {
            return Err(Diagnostic::error(
                variable.name.loc,
                "a variable cannot have incomplete type 'void'",
            )
            .into());
        }

        let llvm_type = self.types.basic_type(&variable.ty)?;

        let storage = match linkage {
            SymbolLinkage::Global => {
                let global = self.module.add_global(llvm_type, None, &variable.name.text);

                let initializer = match &variable.value {
                    None => self.types.default_value(&variable.ty)?,
                    Some(expr) => {
                        let original = self.infer_type(expr)?;
                        self.compile_and_cast(&variable.ty, &original, expr, true)?
                    }
                };

                global.set_initializer(&initializer);
                global.as_pointer_value()
            }

            SymbolLinkage::Local => {
                let alloca = self
                    .builder
                    .build_alloca(llvm_type, &variable.name.text)
                    .map_err(CodeGenError::backend)?;

                let value = match &variable.value {
                    None => self.types.default_value(&variable.ty)?,
                    Some(expr) => {
                        let original = self.infer_type(expr)?;
                        self.compile_and_cast(&variable.ty, &original, expr, false)?
                    }
                };

                self.builder
                    .build_store(alloca, value)
                    .map_err(CodeGenError::backend)?;

                alloca
            }
        };

        self.symbol_table.set(Symbol {
            ty: variable.ty.clone(),
            name: variable.name.clone(),
            linkage,
            value: SymbolValue::Storage(storage),
        })?;

        Ok(())
    }

    /// Emit a function prototype or definition.
    fn compile_function(&mut self, function: &Function) -> Result<()> {
        let prototype = &function.prototype;

        if prototype.name.text == "main" && prototype.return_type != Type::Int {
            Diagnostic::warning(prototype.name.loc, "return type of 'main' is not 'int'").emit();
        }

        let signature = prototype.function_type();
        let function_type = self.types.function_type(&signature)?;
        let function_value = self
            .module
            .add_function(&prototype.name.text, function_type, None);

        self.symbol_table.set(Symbol {
            ty: Type::Function(Box::new(signature)),
            name: prototype.name.clone(),
            linkage: SymbolLinkage::Global,
            value: SymbolValue::Function(function_value),
        })?;

        if !prototype.is_definition {
            return Ok(());
        }

        let entry_block = self.context.append_basic_block(function_value, "entry");
        self.builder.position_at_end(entry_block);

        self.current_function = Some(CurrentFunction {
            return_type: prototype.return_type.clone(),
            returned: false,
        });

        // Spill each incoming parameter to its own stack slot so the body
        // can address it like any other local.
        for (index, parameter) in prototype.parameters.iter().enumerate() {
            let llvm_type = self.types.basic_type(&parameter.ty)?;

            let alloca = self
                .builder
                .build_alloca(llvm_type, &parameter.name.text)
                .map_err(CodeGenError::backend)?;

            let incoming = function_value.get_nth_param(index as u32).ok_or_else(|| {
                CodeGenError::Backend(format!("missing parameter {} on function value", index))
            })?;

            self.builder
                .build_store(alloca, incoming)
                .map_err(CodeGenError::backend)?;

            self.symbol_table.set(Symbol {
                ty: parameter.ty.clone(),
                name: parameter.name.clone(),
                linkage: SymbolLinkage::Local,
                value: SymbolValue::Storage(alloca),
            })?;
        }

        for stmt in &function.body {
            self.compile_stmt(stmt)?;
        }

        let returned = self
            .current_function
            .as_ref()
            .map(|current| current.returned)
            .unwrap_or(false);

        if !returned {
            if prototype.return_type == Type::Void {
                self.builder
                    .build_return(None)
                    .map_err(CodeGenError::backend)?;
            } else {
                let default = self.types.default_value(&prototype.return_type)?;
                self.builder
                    .build_return(Some(&default))
                    .map_err(CodeGenError::backend)?;
            }
        }

        self.symbol_table.reset();
        self.current_function = None;

        Ok(())
    }

    // =========================================================================
    // Object emission
    // =========================================================================

    /// Write the module as a relocatable object file for the host target.
    pub fn write_object_file(&self, path: &Path) -> Result<()> {
        Target::initialize_all(&InitializationConfig::default());

        let triple = TargetMachine::get_default_triple();
        let target = Target::from_triple(&triple)
            .map_err(|e| CodeGenError::Backend(e.to_string()))?;

        let target_machine = target
            .create_target_machine(
                &triple,
                "generic",
                "",
                OptimizationLevel::Default,
                RelocMode::Default,
                CodeModel::Default,
            )
            .ok_or_else(|| {
                CodeGenError::Backend("failed to create target machine".to_string())
            })?;

        target_machine
            .write_to_file(&self.module, FileType::Object, path)
            .map_err(|e| CodeGenError::Backend(e.to_string()))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use micc_par::Parser;

    /// Parse, compile, verify, and render the module as IR text.
    fn compile(source: &str) -> Result<String> {
        let context = Context::create();
        let mut gen = CodeGen::new(&context, "test.c");

        let root = Parser::new(source)
            .parse_root()
            .expect("test source should parse");

        gen.compile_root(&root)?;

        if let Err(message) = gen.module.verify() {
            panic!("module failed verification: {}", message);
        }

        Ok(gen.module.print_to_string().to_string())
    }

    fn compile_error(source: &str) -> String {
        compile(source).expect_err("source should be rejected").to_string()
    }

    // =========================================================================
    // Functions
    // =========================================================================

    #[test]
    fn test_minimal_main() {
        let ir = compile("int main(void) { return 0; }").unwrap();
        assert!(ir.contains("define i32 @main"), "ir was:\n{}", ir);
        assert!(ir.contains("ret i32 0"), "ir was:\n{}", ir);
    }

    #[test]
    fn test_constant_expression_folds() {
        let ir = compile("int main() { return 1 + 2 * 3; }").unwrap();
        assert!(ir.contains("ret i32 7"), "ir was:\n{}", ir);
    }

    #[test]
    fn test_negative_constant() {
        let ir = compile("int main(void) { return -1; }").unwrap();
        assert!(ir.contains("ret i32 -1"), "ir was:\n{}", ir);
    }

    #[test]
    fn test_prototype_only_emits_declaration() {
        let ir = compile("int f(int a);").unwrap();
        assert!(ir.contains("declare i32 @f(i32)"), "ir was:\n{}", ir);
    }

    #[test]
    fn test_implicit_void_return() {
        let ir = compile("void f(void) { }").unwrap();
        assert!(ir.contains("ret void"), "ir was:\n{}", ir);
    }

    #[test]
    fn test_implicit_default_return() {
        let ir = compile("int f(void) { }").unwrap();
        assert!(ir.contains("ret i32 0"), "ir was:\n{}", ir);
    }

    #[test]
    fn test_parameters_are_spilled_and_reloaded() {
        let ir = compile("int add(int a, int b) { return a + b; }").unwrap();
        assert!(ir.contains("alloca i32"), "ir was:\n{}", ir);
        assert!(ir.contains("store i32"), "ir was:\n{}", ir);
        assert!(ir.contains("add i32"), "ir was:\n{}", ir);
    }

    #[test]
    fn test_main_with_non_int_return_type_still_compiles() {
        // Emits a warning on stderr, not an error.
        let ir = compile("void main(void) { }").unwrap();
        assert!(ir.contains("define void @main"), "ir was:\n{}", ir);
    }

    // =========================================================================
    // Globals
    // =========================================================================

    #[test]
    fn test_global_default_initializers() {
        let ir = compile("long long counter; double ratio;").unwrap();
        assert!(ir.contains("@counter = global i64 0"), "ir was:\n{}", ir);
        assert!(ir.contains("@ratio = global double 0"), "ir was:\n{}", ir);
    }

    #[test]
    fn test_global_initializers_cast_both_directions() {
        // int literal into a float global, float literal into an int global.
        let ir = compile("float x = 1; int y = 3.7;").unwrap();
        assert!(ir.contains("@x = global float 1"), "ir was:\n{}", ir);
        assert!(ir.contains("@y = global i32 3"), "ir was:\n{}", ir);
    }

    #[test]
    fn test_global_initializer_folds_arithmetic() {
        let ir = compile("int x = 2 * 3 + 4;").unwrap();
        assert!(ir.contains("@x = global i32 10"), "ir was:\n{}", ir);
    }

    #[test]
    fn test_global_truncation_wraps() {
        let ir = compile("char c = 300;").unwrap();
        assert!(ir.contains("@c = global i8 44"), "ir was:\n{}", ir);
    }

    #[test]
    fn test_global_initializer_rejects_identifiers() {
        assert!(
            compile_error("int x = 1; int y = x;").contains("expected a constant expression only")
        );
    }

    #[test]
    fn test_global_initializer_rejects_calls() {
        assert!(
            compile_error("int f(void); int x = f();")
                .contains("expected a constant expression only")
        );
    }

    // =========================================================================
    // Locals and coercion
    // =========================================================================

    #[test]
    fn test_local_variable_load_store() {
        let ir = compile("int main(void) { int x = 3; return x; }").unwrap();
        assert!(ir.contains("alloca i32"), "ir was:\n{}", ir);
        assert!(ir.contains("store i32 3"), "ir was:\n{}", ir);
        assert!(ir.contains("load i32"), "ir was:\n{}", ir);
    }

    #[test]
    fn test_float_to_int_runtime_cast() {
        let ir = compile("int main(void) { float f = 2.5; return f; }").unwrap();
        assert!(ir.contains("fptosi"), "ir was:\n{}", ir);
    }

    #[test]
    fn test_int_to_float_runtime_cast() {
        let ir = compile("float scale(int n) { return n; }").unwrap();
        assert!(ir.contains("sitofp"), "ir was:\n{}", ir);
    }

    #[test]
    fn test_int_widening_cast() {
        let ir = compile("long long widen(char c) { return c; }").unwrap();
        assert!(ir.contains("sext"), "ir was:\n{}", ir);
    }

    #[test]
    fn test_integer_division_is_unsigned() {
        let ir = compile("int main(void) { int a = 8; int b = 2; return a / b; }").unwrap();
        assert!(ir.contains("udiv"), "ir was:\n{}", ir);
    }

    #[test]
    fn test_float_division() {
        let ir = compile("double halve(double x) { return x / 2.0; }").unwrap();
        assert!(ir.contains("fdiv"), "ir was:\n{}", ir);
    }

    // =========================================================================
    // Calls
    // =========================================================================

    #[test]
    fn test_call_with_coerced_arguments() {
        let ir = compile(
            "int add(int a, int b) { return a + b; } \
             int main(void) { return add(1, 2); }",
        )
        .unwrap();
        assert!(ir.contains("call i32 @add(i32 1, i32 2)"), "ir was:\n{}", ir);
    }

    #[test]
    fn test_call_through_empty_prototype_is_variadic() {
        // "int f();" promises nothing about arguments, so any count goes.
        let ir = compile("int f(); int main(void) { return f(1, 2, 3); }").unwrap();
        assert!(ir.contains("declare i32 @f(...)"), "ir was:\n{}", ir);
    }

    #[test]
    fn test_arity_mismatch_too_many() {
        assert!(compile_error("int f(void); int main(void) { return f(1); }")
            .contains("expected 0 arguments got 1"));
    }

    #[test]
    fn test_arity_mismatch_too_few() {
        assert!(
            compile_error("int f(int a, int b); int main(void) { return f(1); }")
                .contains("expected 2 arguments got 1")
        );
    }

    #[test]
    fn test_call_of_non_function() {
        assert!(compile_error("int x; int main(void) { return x(); }")
            .contains("expected a callable"));
    }

    #[test]
    fn test_call_as_statement() {
        let ir = compile(
            "void touch(void) { } \
             int main(void) { touch(); return 0; }",
        )
        .unwrap();
        assert!(ir.contains("call void @touch()"), "ir was:\n{}", ir);
    }

    #[test]
    fn test_unused_expression_statement_is_skipped() {
        // Warns on stderr and emits nothing for the dead expression.
        let ir = compile("int main(void) { 1 + 2; return 0; }").unwrap();
        assert!(ir.contains("ret i32 0"), "ir was:\n{}", ir);
    }

    // =========================================================================
    // Semantic errors
    // =========================================================================

    #[test]
    fn test_undefined_identifier() {
        let message = compile_error("int main() { return x; }");
        assert!(message.contains("error: undefined 'x'"), "was: {}", message);
        assert!(message.starts_with("1:"), "was: {}", message);
    }

    #[test]
    fn test_void_variable_is_rejected() {
        assert!(compile_error("void x;")
            .contains("a variable cannot have incomplete type 'void'"));
    }

    #[test]
    fn test_void_local_is_rejected() {
        assert!(compile_error("int main(void) { void x; return 0; }")
            .contains("a variable cannot have incomplete type 'void'"));
    }

    #[test]
    fn test_global_redefinition() {
        assert!(compile_error("int x; float x;").contains("redefinition of 'x'"));
    }

    #[test]
    fn test_local_redefinition() {
        assert!(compile_error("int main(void) { int x; int x; return 0; }")
            .contains("redefinition of 'x'"));
    }

    #[test]
    fn test_local_may_shadow_nothing_across_functions() {
        // Locals are reset between bodies, so the same name is fine.
        let ir = compile(
            "int f(void) { int x = 1; return x; } \
             int g(void) { int x = 2; return x; }",
        )
        .unwrap();
        assert!(ir.contains("define i32 @f"), "ir was:\n{}", ir);
        assert!(ir.contains("define i32 @g"), "ir was:\n{}", ir);
    }

    #[test]
    fn test_bare_return_in_non_void_function() {
        assert!(compile_error("int main(void) { return; }")
            .contains("expected non-void return type"));
    }

    #[test]
    fn test_bare_return_in_void_function() {
        let ir = compile("void f(void) { return; }").unwrap();
        assert!(ir.contains("ret void"), "ir was:\n{}", ir);
    }
}

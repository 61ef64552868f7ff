//! Argument binding and return checks against a declared [`Signature`].

use crate::error::Result;
use crate::error::RuntimeError;
use crate::types::Signature;
use crate::types::TypeDecl;
use crate::types::TypeSpec;
use crate::value::Value;

/// Arguments after binding: the raw passed list plus one value per parameter.
#[derive(Debug, Clone, Default)]
pub(crate) struct BoundArgs {
    pub(crate) passed: Vec<Value>,
    pub(crate) params: Vec<(String, Value)>,
}

pub(crate) fn bind(
    function: &str,
    signature: &Signature,
    args: Vec<Value>,
    is_a: &dyn Fn(&str, &str) -> bool,
) -> Result<BoundArgs> {
    let required = signature.required_count();
    if args.len() < required {
        let qualifier = if signature.max_count() == Some(required) {
            "exactly"
        } else {
            "at least"
        };
        return Err(RuntimeError::ArgumentCount {
            function: function.to_string(),
            passed: args.len(),
            expected: required,
            qualifier,
        });
    }

    let mut params = Vec::with_capacity(signature.params.len());
    for (idx, param) in signature.params.iter().enumerate() {
        if param.variadic {
            let rest = args.get(idx..).unwrap_or_default().to_vec();
            for (offset, value) in rest.iter().enumerate() {
                check_arg(function, idx + offset + 1, &param.name, param.ty.as_ref(), value, is_a)?;
            }
            params.push((param.name.clone(), Value::List(rest)));
            break;
        }
        let value = match args.get(idx) {
            Some(value) => {
                check_arg(function, idx + 1, &param.name, param.ty.as_ref(), value, is_a)?;
                value.clone()
            }
            None => param.default.clone().unwrap_or_default(),
        };
        params.push((param.name.clone(), value));
    }

    Ok(BoundArgs {
        passed: args,
        params,
    })
}

fn check_arg(
    function: &str,
    position: usize,
    name: &str,
    ty: Option<&TypeSpec>,
    value: &Value,
    is_a: &dyn Fn(&str, &str) -> bool,
) -> Result<()> {
    let Some(ty) = ty else {
        return Ok(());
    };
    if ty.accepts(value, is_a) {
        return Ok(());
    }
    Err(RuntimeError::ArgumentType {
        function: function.to_string(),
        position,
        name: name.to_string(),
        expected: ty.to_string(),
        given: value.type_name(),
    })
}

pub(crate) fn check_return(
    function: &str,
    signature: &Signature,
    value: &Value,
    is_a: &dyn Fn(&str, &str) -> bool,
) -> Result<()> {
    let Some(ty) = signature.return_type.as_ref() else {
        return Ok(());
    };
    let ok = match ty.decl {
        TypeDecl::Void => value.is_null(),
        _ => ty.accepts(value, is_a),
    };
    if ok {
        return Ok(());
    }
    Err(RuntimeError::ReturnType {
        function: function.to_string(),
        expected: ty.to_string(),
        given: value.type_name(),
    })
}

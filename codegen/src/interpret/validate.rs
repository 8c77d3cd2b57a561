/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use super::Value;
use crate::ir::{CodecPlan, RoutineBody, ValidatedMember, ValidationPlan};
use shapecodec_types::error::validation::InvalidParamsError;

fn validation<'p>(plan: &'p CodecPlan, routine: &str) -> Option<&'p ValidationPlan> {
    match plan.routine_named(routine).map(|routine| &routine.body) {
        Some(RoutineBody::Validate(validation)) => Some(validation),
        _ => None,
    }
}

/// Runs the validator `routine` over `value`. Values of the wrong kind are left to the encoder.
pub(super) fn run(plan: &CodecPlan, routine: &str, value: &Value) -> Result<(), InvalidParamsError> {
    let validation = match validation(plan, routine) {
        Some(validation) => validation,
        None => {
            tracing::debug!(routine, "validator is not in the plan");
            return Ok(());
        }
    };
    match (validation, value) {
        (ValidationPlan::Structure { shape, members }, Value::Structure(values)) => {
            let mut err = InvalidParamsError::new(shape.name());
            for member in members {
                match values.get(&member.name) {
                    None | Some(Value::Null) if member.required => err.add_required(&member.name),
                    None | Some(Value::Null) => {}
                    Some(value) => nested(plan, member, &member.name, value, &mut err),
                }
            }
            err.into_result()
        }
        (ValidationPlan::Union { shape, variants }, Value::Union(variant, inner)) => {
            let mut err = InvalidParamsError::new(shape.name());
            if let Some(member) = variants.iter().find(|member| &member.name == variant) {
                nested(plan, member, &member.name, inner, &mut err);
            }
            err.into_result()
        }
        (
            ValidationPlan::List {
                shape,
                element: Some(element),
                ..
            },
            Value::List(items),
        ) => {
            let mut err = InvalidParamsError::new(shape.name());
            for (idx, item) in items.iter().enumerate() {
                if *item == Value::Null {
                    continue;
                }
                if let Err(nested) = run(plan, element, item) {
                    err.add_nested(&format!("[{}]", idx), nested);
                }
            }
            err.into_result()
        }
        (
            ValidationPlan::Map {
                shape,
                value: Some(routine),
                ..
            },
            Value::Map(entries),
        ) => {
            let mut err = InvalidParamsError::new(shape.name());
            for (key, entry) in entries {
                if *entry == Value::Null {
                    continue;
                }
                if let Err(nested) = run(plan, routine, entry) {
                    err.add_nested(&format!("[{}]", key), nested);
                }
            }
            err.into_result()
        }
        _ => Ok(()),
    }
}

fn nested(
    plan: &CodecPlan,
    member: &ValidatedMember,
    path: &str,
    value: &Value,
    err: &mut InvalidParamsError,
) {
    if let Some(routine) = &member.nested {
        if let Err(nested) = run(plan, routine, value) {
            err.add_nested(path, nested);
        }
    }
}

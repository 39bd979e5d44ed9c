use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value as Json;

use super::{assign, assigned_values, declared_values, evaluate, BuildContext};
use crate::collector::TypeChain;
use crate::error::{ParseError, ParseResult};
use crate::schema::{Data, Entity};

/// A named set of node templates
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Group {
    pub name: String,
    pub types: Vec<String>,
    pub properties: IndexMap<String, Json>,
    pub members: Vec<String>,
}

pub(crate) fn build_group(name: &str, definition: &Entity, ctx: &BuildContext<'_>) -> ParseResult<Group> {
    let type_ref = definition.reference("type").ok_or_else(|| {
        ParseError::new("Missing required field: type (in group definition).", definition.loc())
    })?;
    let chain = TypeChain::resolve(type_ref, ctx.root)?;

    let mut properties = declared_values(chain.collect("properties"));
    assign(&mut properties, assigned_values(definition, "properties"), "group property")?;

    let members = definition
        .list("members")
        .iter()
        .filter_map(Data::as_reference)
        .map(|member| member.resolve(ctx.root).map(|_| member.name().to_string()))
        .collect::<ParseResult<Vec<_>>>()?;

    let eval = ctx.eval_context(&properties);
    Ok(Group {
        name: name.to_string(),
        types: chain.names(),
        properties: evaluate(&properties, &eval)?,
        members,
    })
}

//! Module: executor::plan
//! Responsibility: lower one query into a rooted iterator tree, wiring
//! per-node resume positions from a decoded cursor.
//! Does not own: page assembly or token issuance.
//!
//! Shapes:
//! - no RANGE and no property ordering: identifier-space merge tree
//!   (scans, static ids, intersection, union, difference);
//! - any RANGE or a property ordering: an ordered root whose driver walks
//!   the primary order row, filtered by a membership check tree.

use crate::{
    db::{
        cursor::{CursorCache, NodePath},
        direction::Direction,
        executor::iter::{
            IndexScanner, IntersectionNode, NodeKind, NotNode, OrderByNode, OrderKey, ResultNode,
            ScanContext, ScanLayout, UnionNode,
        },
        index::{
            ComponentRange, IndexRowKey,
            key::{encode_name_component, encode_value_component},
        },
        query::{IDENTIFIER_PROPERTY, OrderField, Predicate, Query},
        value::Value,
    },
    error::InternalError,
};
use std::ops::Bound;

/// Build the root iterator for `query`, resuming each node from `positions`.
pub(crate) fn plan_query<'s>(
    ctx: ScanContext<'s>,
    query: &Query,
    positions: &CursorCache,
) -> Result<ResultNode<'s>, InternalError> {
    let predicate = match (query.static_id, query.predicate.clone()) {
        (Some(id), None) => {
            let direction = query.order.first().map_or(Direction::Asc, |field| field.direction);
            return Ok(ResultNode::static_id(id, direction));
        }
        (Some(id), Some(predicate)) => Some(Predicate::and(vec![
            Predicate::eq(IDENTIFIER_PROPERTY, id),
            predicate,
        ])),
        (None, predicate) => predicate,
    };

    let has_range = predicate.as_ref().is_some_and(Predicate::has_range);
    let property_order = query.order.first().is_some_and(|field| !field.is_identifier());

    if !has_range && !property_order {
        let direction = query.order.first().map_or(Direction::Asc, |field| field.direction);
        let builder = TreeBuilder {
            ctx,
            direction,
            positions: Some(positions),
        };

        return match &predicate {
            Some(predicate) => builder.build(predicate, &NodePath::root()),
            None => Ok(builder.members(&NodePath::root())),
        };
    }

    plan_ordered(ctx, &query.order, predicate, positions)
}

// Ordered root: driver over the primary order row plus membership checks.
fn plan_ordered<'s>(
    ctx: ScanContext<'s>,
    order: &[OrderField],
    mut predicate: Option<Predicate>,
    positions: &CursorCache,
) -> Result<ResultNode<'s>, InternalError> {
    let (primary, secondary) = match order.split_first() {
        Some((first, rest)) => (first.clone(), rest),
        None => {
            let property = predicate
                .as_ref()
                .and_then(Predicate::first_range_property)
                .ok_or_else(|| {
                    InternalError::query_unsupported("ordered evaluation needs an order or a range")
                })?;
            (OrderField::new(property, Direction::Asc), &[][..])
        }
    };

    let driver = if primary.is_identifier() {
        IndexScanner::new(
            ctx,
            IndexRowKey::members(ctx.app, ctx.scope),
            ScanLayout::Owner,
            primary.direction,
            None,
        )
    } else {
        let range = match take_driver_range(&mut predicate, &primary.property) {
            Some((lower, upper)) => ComponentRange::try_new(&lower, &upper)?,
            None => ComponentRange::try_new(&Bound::Unbounded, &Bound::Unbounded)?,
        };
        IndexScanner::new(
            ctx,
            IndexRowKey::property(ctx.app, ctx.scope, &primary.property),
            ScanLayout::Value {
                range,
                entries_prefix: encode_name_component(&primary.property),
            },
            primary.direction,
            None,
        )
    };

    let checks = TreeBuilder {
        ctx,
        direction: Direction::Asc,
        positions: None,
    };
    let membership = predicate
        .as_ref()
        .map(|predicate| checks.build(predicate, &NodePath::root().child(1)))
        .transpose()?;

    let secondary = secondary
        .iter()
        .map(|field| {
            if field.is_identifier() {
                OrderKey::identifier(field.direction)
            } else {
                OrderKey::property(&field.property, field.direction)
            }
        })
        .collect();
    let resume_rank = positions.get(&NodePath::root()).map(<[u8]>::to_vec);

    let node = OrderByNode::new(ctx, driver, membership, secondary, resume_rank)?;

    Ok(ResultNode::new(NodeKind::OrderBy(node)))
}

// Remove the first top-level RANGE on `property` and return its bounds.
fn take_driver_range(
    predicate: &mut Option<Predicate>,
    property: &str,
) -> Option<(Bound<Value>, Bound<Value>)> {
    let is_driver = |term: &Predicate| {
        matches!(term, Predicate::Range { property: p, .. } if p == property)
    };

    match predicate.take() {
        Some(Predicate::Range {
            property: p,
            lower,
            upper,
        }) if p == property => Some((lower, upper)),
        Some(Predicate::And(mut children)) => {
            let found = children.iter().position(is_driver).map(|idx| children.remove(idx));
            *predicate = match children.len() {
                0 => None,
                1 => children.pop(),
                _ => Some(Predicate::And(children)),
            };
            match found {
                Some(Predicate::Range { lower, upper, .. }) => Some((lower, upper)),
                _ => None,
            }
        }
        other => {
            *predicate = other;
            None
        }
    }
}

///
/// TreeBuilder
///
/// Recursive predicate lowering. With `positions`, leaves resume from the
/// cursor entry at their path; without, the tree only answers membership
/// checks and RANGE leaves are allowed.
///

struct TreeBuilder<'s, 'p> {
    ctx: ScanContext<'s>,
    direction: Direction,
    positions: Option<&'p CursorCache>,
}

impl<'s> TreeBuilder<'s, '_> {
    fn build(
        &self,
        predicate: &Predicate,
        path: &NodePath,
    ) -> Result<ResultNode<'s>, InternalError> {
        match predicate {
            Predicate::Equals { property, value } if property == IDENTIFIER_PROPERTY => match value
            {
                Value::Id(id) => Ok(ResultNode::static_id(*id, self.direction)),
                other => Err(InternalError::query_unsupported(format!(
                    "{IDENTIFIER_PROPERTY} only compares with identifiers, found {}",
                    other.tag().label()
                ))),
            },
            Predicate::Equals { property, value } => Ok(self.scan(
                IndexRowKey::property(self.ctx.app, self.ctx.scope, property),
                ScanLayout::Fixed {
                    component: encode_value_component(value)?,
                },
                path,
            )),
            Predicate::Contains { property, keyword } => Ok(self.scan(
                IndexRowKey::keyword(self.ctx.app, self.ctx.scope, property),
                ScanLayout::Fixed {
                    component: encode_value_component(&Value::text(keyword.as_str()))?,
                },
                path,
            )),
            Predicate::Range {
                property,
                lower,
                upper,
            } => {
                if self.positions.is_some() {
                    return Err(InternalError::query_unsupported(
                        "range terms require ordered evaluation",
                    ));
                }
                Ok(self.scan(
                    IndexRowKey::property(self.ctx.app, self.ctx.scope, property),
                    ScanLayout::Value {
                        range: ComponentRange::try_new(lower, upper)?,
                        entries_prefix: encode_name_component(property),
                    },
                    path,
                ))
            }
            Predicate::Not(inner) => {
                let include = self.members(&path.child(0));
                let exclude = self.build(inner, &path.child(1))?;
                difference(include, exclude)
            }
            Predicate::And(children) => self.build_and(children, path),
            Predicate::Or(children) => self.build_or(children, path),
        }
    }

    // Positive terms intersect; negated terms are unioned and subtracted.
    fn build_and(
        &self,
        children: &[Predicate],
        path: &NodePath,
    ) -> Result<ResultNode<'s>, InternalError> {
        let (negated, positive): (Vec<&Predicate>, Vec<&Predicate>) = children
            .iter()
            .partition(|child| matches!(child, Predicate::Not(_)));
        let negated: Vec<&Predicate> = negated
            .into_iter()
            .filter_map(|child| match child {
                Predicate::Not(inner) => Some(inner.as_ref()),
                _ => None,
            })
            .collect();

        match (positive.is_empty(), negated.is_empty()) {
            (true, true) => Err(InternalError::query_unsupported("AND requires at least one term")),
            (false, true) => self.intersection(&positive, path),
            (true, false) => {
                let include = self.members(&path.child(0));
                let exclude = self.union(&negated, &path.child(1))?;
                difference(include, exclude)
            }
            (false, false) => {
                let include = self.intersection(&positive, &path.child(0))?;
                let exclude = self.union(&negated, &path.child(1))?;
                difference(include, exclude)
            }
        }
    }

    fn build_or(
        &self,
        children: &[Predicate],
        path: &NodePath,
    ) -> Result<ResultNode<'s>, InternalError> {
        if children.is_empty() {
            return Err(InternalError::query_unsupported("OR requires at least one term"));
        }
        let children: Vec<&Predicate> = children.iter().collect();

        self.union(&children, path)
    }

    fn intersection(
        &self,
        terms: &[&Predicate],
        path: &NodePath,
    ) -> Result<ResultNode<'s>, InternalError> {
        if let [single] = terms {
            return self.build(single, path);
        }
        let children = self.children(terms, path)?;

        Ok(ResultNode::new(NodeKind::Intersection(IntersectionNode::new(
            children,
        )?)))
    }

    fn union(
        &self,
        terms: &[&Predicate],
        path: &NodePath,
    ) -> Result<ResultNode<'s>, InternalError> {
        if let [single] = terms {
            return self.build(single, path);
        }
        let children = self.children(terms, path)?;

        Ok(ResultNode::new(NodeKind::Union(UnionNode::new(children)?)))
    }

    fn children(
        &self,
        terms: &[&Predicate],
        path: &NodePath,
    ) -> Result<Vec<ResultNode<'s>>, InternalError> {
        terms
            .iter()
            .enumerate()
            .map(|(idx, term)| self.build(term, &path.child(idx)))
            .collect()
    }

    // Every member of the scope, in identifier order.
    fn members(&self, path: &NodePath) -> ResultNode<'s> {
        self.scan(
            IndexRowKey::members(self.ctx.app, self.ctx.scope),
            ScanLayout::Owner,
            path,
        )
    }

    fn scan(&self, row: IndexRowKey, layout: ScanLayout, path: &NodePath) -> ResultNode<'s> {
        let resume_from = self
            .positions
            .and_then(|positions| positions.get(path))
            .map(<[u8]>::to_vec);
        let scanner = IndexScanner::new(self.ctx, row, layout, self.direction, resume_from);

        ResultNode::new(NodeKind::Scan(scanner))
    }
}

fn difference<'s>(
    include: ResultNode<'s>,
    exclude: ResultNode<'s>,
) -> Result<ResultNode<'s>, InternalError> {
    Ok(ResultNode::new(NodeKind::Not(NotNode::new(include, exclude)?)))
}

//! Module: executor::iter::order_by
//! Responsibility: ordered traversal by property values with deterministic
//! tie-break, filtered by an optional membership subtree.
//! Does not own: choosing the driver range or building the membership tree.

use crate::{
    db::{
        cursor::{CursorCache, NodePath},
        direction::Direction,
        executor::iter::{
            Batch, ResultNode, ScanColumn,
            node::NodeOps,
            scan::{IndexScanner, ScanContext, ScanLayout},
        },
        identity::{IDENTIFIER_LEN, Identifier},
        index::key::{IndexColumn, encode_name_component, owner_column, split_value_component},
    },
    error::InternalError,
};
use std::collections::BTreeMap;

/// Rank byte for an absent order value; sorts after every present value in
/// both directions.
const MISSING_RANK: u8 = 0xFF;

///
/// OrderKey
///
/// Secondary ordering term, either a property looked up through the
/// owner's entity-entries row or the identifier itself.
///

pub(crate) struct OrderKey {
    entries_prefix: Option<Vec<u8>>,
    direction: Direction,
}

impl OrderKey {
    pub(crate) fn property(name: &str, direction: Direction) -> Self {
        Self {
            entries_prefix: Some(encode_name_component(name)),
            direction,
        }
    }

    pub(crate) const fn identifier(direction: Direction) -> Self {
        Self {
            entries_prefix: None,
            direction,
        }
    }
}

///
/// TieOrder
///
/// How members sharing one primary value reach their final order.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum TieOrder {
    /// The driver already yields ties in final order.
    Streamed,

    /// Ties follow the owner in this direction, opposite to the driver's.
    Owner(Direction),

    /// Ties follow secondary property values. Each pass over the group
    /// selects the next window of ranks.
    Ranked,
}

///
/// Phase
///

#[derive(Default)]
enum Phase<'s> {
    /// The driver head is either the next member or the start of a group.
    #[default]
    Driver,

    Group {
        component: Vec<u8>,
        scan: IndexScanner<'s>,
    },

    Ranked {
        component: Vec<u8>,
        scan: IndexScanner<'s>,
        best: BTreeMap<Vec<u8>, ScanColumn>,
    },
}

///
/// ResumePoint
///
/// Last delivered member, recovered from an ordered cursor rank.
///

#[derive(Debug, Eq, PartialEq)]
struct ResumePoint {
    component: Vec<u8>,
    owner: Identifier,
    rank: Vec<u8>,
}

impl ResumePoint {
    fn decode(
        owner_driven: bool,
        direction: Direction,
        rank: Vec<u8>,
    ) -> Result<Self, InternalError> {
        let owner = Identifier::from_column_suffix(&rank)
            .ok_or_else(|| InternalError::malformed_cursor("ordered cursor is truncated"))?;

        let component = if owner_driven {
            owner.to_bytes().to_vec()
        } else {
            let plain: Vec<u8> = match direction {
                Direction::Asc => rank.clone(),
                Direction::Desc => rank.iter().map(|byte| !byte).collect(),
            };
            let (component, _) = split_value_component(&plain).ok_or_else(|| {
                InternalError::malformed_cursor("ordered cursor does not start with a value")
            })?;
            component.to_vec()
        };

        Ok(Self {
            component,
            owner,
            rank,
        })
    }
}

///
/// OrderByNode
///
/// Root-only node. A driver scan walks the primary order property (or the
/// identifier) in its direction; members are filtered through the
/// membership subtree and ordered by secondary keys, then by identifier
/// ascending, within each primary value.
///
/// Ties are never buffered whole. They stream from the driver, from an
/// owner scan over the group, or from windowed selection passes when a
/// secondary property decides the order.
///
/// Emitted sort keys are rank bytes whose ascending order is the emission
/// order, so the node always reports `Asc`.
///

pub(crate) struct OrderByNode<'s> {
    ctx: ScanContext<'s>,
    driver: IndexScanner<'s>,
    membership: Option<Box<ResultNode<'s>>>,
    secondary: Vec<OrderKey>,
    tie: TieOrder,
    resume: Option<ResumePoint>,
    floor: Option<Vec<u8>>,
    phase: Phase<'s>,
}

impl<'s> OrderByNode<'s> {
    pub(crate) fn new(
        ctx: ScanContext<'s>,
        driver: IndexScanner<'s>,
        membership: Option<ResultNode<'s>>,
        secondary: Vec<OrderKey>,
        resume_rank: Option<Vec<u8>>,
    ) -> Result<Self, InternalError> {
        let owner_driven = match driver.layout() {
            ScanLayout::Owner => true,
            ScanLayout::Value { .. } => false,
            ScanLayout::Fixed { .. } => {
                return Err(InternalError::iterator_invariant(
                    "ordered traversal requires a range or membership driver",
                ));
            }
        };
        let direction = driver_direction(&driver);

        // Identifiers are unique, so nothing after an identifier key can
        // change the order.
        let secondary = if owner_driven {
            Vec::new()
        } else {
            through_identifier(secondary)
        };
        let tie = tie_order(owner_driven, direction, &secondary);

        let resume = resume_rank
            .map(|rank| ResumePoint::decode(owner_driven, direction, rank))
            .transpose()?;

        let mut node = Self {
            ctx,
            driver,
            membership: membership.map(Box::new),
            secondary,
            tie,
            floor: resume.as_ref().map(|point| point.rank.clone()),
            resume,
            phase: Phase::Driver,
        };
        node.seek_driver();

        Ok(node)
    }

    // Position the driver for the cursor, if any.
    fn seek_driver(&mut self) {
        let Some(resume) = &self.resume else {
            return;
        };
        let anchor = match (self.driver.layout(), self.tie) {
            (ScanLayout::Owner, _) => owner_column(resume.owner),
            (_, TieOrder::Streamed) => IndexColumn::encode(&resume.component, resume.owner),
            _ => group_start(&resume.component, driver_direction(&self.driver)),
        };

        self.driver.seek_after(anchor);
    }

    // Primary value of one driver column: its value component, or the owner
    // when the driver walks identifiers.
    fn group_component(&self, column: &ScanColumn) -> Result<Vec<u8>, InternalError> {
        match self.driver.layout() {
            ScanLayout::Value { .. } => Ok(IndexColumn::decode(column.position())?
                .component()
                .to_vec()),
            _ => Ok(column.owner().to_bytes().to_vec()),
        }
    }

    // Owner scan over the driver row's columns for one primary value. The
    // cursor's group resumes after its last delivered owner.
    fn group_scan(
        &self,
        component: &[u8],
        direction: Direction,
        resume: bool,
    ) -> IndexScanner<'s> {
        let resume_from = self
            .resume
            .as_ref()
            .filter(|point| resume && point.component == component)
            .map(|point| IndexColumn::encode(component, point.owner));

        IndexScanner::new(
            self.ctx,
            self.driver.row().clone(),
            ScanLayout::Fixed {
                component: component.to_vec(),
            },
            direction,
            resume_from,
        )
    }

    fn leave_group(&mut self, component: &[u8]) {
        let anchor = group_end(component, driver_direction(&self.driver));
        self.driver.seek_after(anchor);
    }

    // Rank one member, or drop it when it is not at its canonical value, was
    // delivered already, or fails membership.
    fn evaluate(
        &mut self,
        component: &[u8],
        column: &ScanColumn,
        multi_valued: bool,
    ) -> Result<Option<ScanColumn>, InternalError> {
        let owner = column.owner();
        if multi_valued && !self.is_canonical(component, owner)? {
            return Ok(None);
        }

        let rank = self.rank(component, owner)?;
        if self
            .floor
            .as_deref()
            .is_some_and(|floor| rank.as_slice() <= floor)
        {
            return Ok(None);
        }

        if let Some(membership) = self.membership.as_mut()
            && !membership.contains(owner)?
        {
            return Ok(None);
        }

        Ok(Some(ScanColumn::new(owner, rank, column.position().to_vec())))
    }

    // A multi-valued owner is visited once, at its first in-range value in
    // driver direction.
    fn is_canonical(&self, component: &[u8], owner: Identifier) -> Result<bool, InternalError> {
        let ScanLayout::Value {
            range,
            entries_prefix,
        } = self.driver.layout()
        else {
            return Ok(true);
        };

        let values = self.ctx.entity_values(owner, entries_prefix)?;
        let mut in_range = values
            .iter()
            .filter(|value| range.contains_component(value));
        let canonical = match driver_direction(&self.driver) {
            Direction::Asc => in_range.next(),
            Direction::Desc => in_range.next_back(),
        };

        Ok(canonical.is_none_or(|canonical| canonical.as_slice() == component))
    }

    fn rank(&self, component: &[u8], owner: Identifier) -> Result<Vec<u8>, InternalError> {
        let mut rank = Vec::with_capacity(component.len() + IDENTIFIER_LEN * 2);
        push_ranked(&mut rank, component, driver_direction(&self.driver));

        for key in &self.secondary {
            match &key.entries_prefix {
                None => push_ranked(&mut rank, &owner.to_bytes(), key.direction),
                Some(prefix) => {
                    let values = self.ctx.entity_values(owner, prefix)?;
                    let chosen = match key.direction {
                        Direction::Asc => values.first(),
                        Direction::Desc => values.last(),
                    };
                    match chosen {
                        Some(value) => push_ranked(&mut rank, value, key.direction),
                        None => rank.push(MISSING_RANK),
                    }
                }
            }
        }

        rank.extend_from_slice(&owner.to_bytes());

        Ok(rank)
    }

    fn emit(&mut self, columns: Vec<ScanColumn>) -> Option<Batch> {
        if let Some(last) = columns.last() {
            self.floor = Some(last.sort_key().to_vec());
        }

        Batch::from_columns(columns)
    }

    // One step of the phase machine. `phase` is held outside `self` so a
    // failed read leaves it intact for the retry.
    fn pull(&mut self, phase: &mut Phase<'s>) -> Result<Option<Batch>, InternalError> {
        let window = self.ctx.window.max(1);

        loop {
            match phase {
                Phase::Driver => {
                    let Some(head) = self.driver.peek()? else {
                        return Ok(None);
                    };
                    let head = head.clone();
                    let component = self.group_component(&head)?;

                    match self.tie {
                        TieOrder::Streamed => {
                            let multi_valued = self.driver.head_multi_valued();
                            let ranked = self.evaluate(&component, &head, multi_valued)?;
                            self.driver.take();
                            if let Some(column) = ranked {
                                return Ok(self.emit(vec![column]));
                            }
                        }
                        TieOrder::Owner(direction) => {
                            let scan = self.group_scan(&component, direction, true);
                            *phase = Phase::Group { component, scan };
                        }
                        TieOrder::Ranked => {
                            let scan = self.group_scan(&component, Direction::Asc, false);
                            *phase = Phase::Ranked {
                                component,
                                scan,
                                best: BTreeMap::new(),
                            };
                        }
                    }
                }

                Phase::Group { component, scan } => {
                    let Some(head) = scan.peek()? else {
                        self.leave_group(component);
                        *phase = Phase::Driver;
                        continue;
                    };
                    let head = head.clone();
                    let multi_valued = scan.head_multi_valued();
                    let ranked = self.evaluate(component, &head, multi_valued)?;
                    scan.take();
                    if let Some(column) = ranked {
                        return Ok(self.emit(vec![column]));
                    }
                }

                Phase::Ranked {
                    component,
                    scan,
                    best,
                } => {
                    if let Some(head) = scan.peek()? {
                        let head = head.clone();
                        let multi_valued = scan.head_multi_valued();
                        if let Some(column) = self.evaluate(component, &head, multi_valued)? {
                            best.insert(column.sort_key().to_vec(), column);
                            if best.len() > window {
                                best.pop_last();
                            }
                        }
                        scan.take();
                        continue;
                    }

                    // A full window may have left ranks behind; the next
                    // pass picks up after the last one emitted.
                    let full = best.len() >= window;
                    let selected: Vec<ScanColumn> = std::mem::take(best).into_values().collect();
                    if full {
                        scan.rewind();
                    } else {
                        self.leave_group(component);
                        *phase = Phase::Driver;
                    }
                    if let Some(batch) = self.emit(selected) {
                        return Ok(Some(batch));
                    }
                }
            }
        }
    }
}

impl NodeOps for OrderByNode<'_> {
    fn advance(&mut self) -> Result<Option<Batch>, InternalError> {
        let mut phase = std::mem::take(&mut self.phase);
        let pulled = self.pull(&mut phase);
        self.phase = phase;

        pulled
    }

    fn rewind(&mut self) {
        self.driver.rewind();
        self.seek_driver();
        self.floor = self.resume.as_ref().map(|point| point.rank.clone());
        self.phase = Phase::Driver;
    }

    fn finalize(&self, cache: &mut CursorCache, path: &NodePath, last: &ScanColumn) {
        cache.insert(path.clone(), last.sort_key().to_vec());
    }

    fn contains(&mut self, _: Identifier) -> Result<bool, InternalError> {
        Err(InternalError::iterator_unsupported(
            "ordered results cannot answer membership checks",
        ))
    }

    fn direction(&self) -> Direction {
        Direction::Asc
    }
}

fn driver_direction(driver: &IndexScanner<'_>) -> Direction {
    NodeOps::direction(driver)
}

fn through_identifier(mut keys: Vec<OrderKey>) -> Vec<OrderKey> {
    if let Some(idx) = keys.iter().position(|key| key.entries_prefix.is_none()) {
        keys.truncate(idx + 1);
    }

    keys
}

fn tie_order(owner_driven: bool, direction: Direction, keys: &[OrderKey]) -> TieOrder {
    if owner_driven {
        return TieOrder::Streamed;
    }

    let tie = match keys.first() {
        None => Direction::Asc,
        Some(key) if key.entries_prefix.is_none() => key.direction,
        Some(_) => return TieOrder::Ranked,
    };

    if tie == direction {
        TieOrder::Streamed
    } else {
        TieOrder::Owner(tie)
    }
}

// Append one component so ascending rank order follows `direction`.
fn push_ranked(rank: &mut Vec<u8>, component: &[u8], direction: Direction) {
    match direction {
        Direction::Asc => rank.extend_from_slice(component),
        Direction::Desc => rank.extend(component.iter().map(|byte| !byte)),
    }
}

// Driver anchor just before the first column of one primary value.
fn group_start(component: &[u8], direction: Direction) -> Vec<u8> {
    match direction {
        Direction::Asc => component.to_vec(),
        Direction::Desc => past_owners(component),
    }
}

// Driver anchor just after the last column of one primary value.
fn group_end(component: &[u8], direction: Direction) -> Vec<u8> {
    match direction {
        Direction::Asc => past_owners(component),
        Direction::Desc => component.to_vec(),
    }
}

fn past_owners(component: &[u8]) -> Vec<u8> {
    let mut anchor = component.to_vec();
    anchor.extend_from_slice(&[0xFF; IDENTIFIER_LEN + 1]);

    anchor
}

///
/// TESTS
///

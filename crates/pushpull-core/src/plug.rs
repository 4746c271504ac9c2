// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Plug identities for the constraint node and the axis routing used when the
//! output is wired onto a transform's translate channels.

use core::fmt;
use core::str::FromStr;

use thiserror::Error;

/// Addressable attribute on a constraint node.
///
/// Compound attributes (`ConstraintTranslate`, `StartPosition`) have X/Y/Z
/// children; an evaluation request for a child is served by its root.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Plug {
    /// Output translation (compound).
    ConstraintTranslate,
    /// Output translation, X child.
    ConstraintTranslateX,
    /// Output translation, Y child.
    ConstraintTranslateY,
    /// Output translation, Z child.
    ConstraintTranslateZ,
    /// Hidden memo of the last computed position.
    LastPosition,
    /// Scene time input.
    InTime,
    /// Activation time.
    StartFrame,
    /// Target separation.
    Distance,
    /// Target world transform input.
    TargetWorldMatrix,
    /// Constrained object's parent world transform input.
    ConstraintParentMatrix,
    /// Rest position (compound).
    StartPosition,
    /// Rest position, X child.
    StartPositionX,
    /// Rest position, Y child.
    StartPositionY,
    /// Rest position, Z child.
    StartPositionZ,
    /// Push toggle.
    Push,
    /// Pull toggle.
    Pull,
}

impl Plug {
    /// Every plug, roots first then children, in declaration order.
    pub const ALL: [Self; 16] = [
        Self::ConstraintTranslate,
        Self::ConstraintTranslateX,
        Self::ConstraintTranslateY,
        Self::ConstraintTranslateZ,
        Self::LastPosition,
        Self::InTime,
        Self::StartFrame,
        Self::Distance,
        Self::TargetWorldMatrix,
        Self::ConstraintParentMatrix,
        Self::StartPosition,
        Self::StartPositionX,
        Self::StartPositionY,
        Self::StartPositionZ,
        Self::Push,
        Self::Pull,
    ];

    /// Attributes authored on the node rather than connected.
    pub const AUTHORED: [Self; 5] = [
        Self::StartFrame,
        Self::Distance,
        Self::StartPosition,
        Self::Push,
        Self::Pull,
    ];

    /// Long attribute name.
    pub const fn long_name(self) -> &'static str {
        match self {
            Self::ConstraintTranslate => "constraintTranslate",
            Self::ConstraintTranslateX => "constraintTranslateX",
            Self::ConstraintTranslateY => "constraintTranslateY",
            Self::ConstraintTranslateZ => "constraintTranslateZ",
            Self::LastPosition => "lastPosition",
            Self::InTime => "inTime",
            Self::StartFrame => "startFrame",
            Self::Distance => "distance",
            Self::TargetWorldMatrix => "targetWorldMatrix",
            Self::ConstraintParentMatrix => "constraintParentMatrix",
            Self::StartPosition => "startPosition",
            Self::StartPositionX => "startPositionX",
            Self::StartPositionY => "startPositionY",
            Self::StartPositionZ => "startPositionZ",
            Self::Push => "push",
            Self::Pull => "pull",
        }
    }

    /// Compound parent of a child plug; roots return themselves.
    pub const fn root(self) -> Self {
        match self {
            Self::ConstraintTranslateX | Self::ConstraintTranslateY | Self::ConstraintTranslateZ => {
                Self::ConstraintTranslate
            }
            Self::StartPositionX | Self::StartPositionY | Self::StartPositionZ => {
                Self::StartPosition
            }
            other => other,
        }
    }

    /// `true` for X/Y/Z children of a compound plug.
    pub fn is_child(self) -> bool {
        self.root() != self
    }

    /// Component axis of a child plug.
    pub const fn axis(self) -> Option<Axis> {
        match self {
            Self::ConstraintTranslateX | Self::StartPositionX => Some(Axis::X),
            Self::ConstraintTranslateY | Self::StartPositionY => Some(Axis::Y),
            Self::ConstraintTranslateZ | Self::StartPositionZ => Some(Axis::Z),
            _ => None,
        }
    }

    /// `true` when a change to this plug makes `constraintTranslate` stale.
    ///
    /// Every input and authored attribute affects the output; the output
    /// itself and the memo do not.
    pub fn affects_output(self) -> bool {
        !matches!(self.root(), Self::ConstraintTranslate | Self::LastPosition)
    }
}

impl fmt::Display for Plug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.long_name())
    }
}

/// Error returned when parsing an unknown axis name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown axis: {0}")]
pub struct ParseAxisError(String);

/// Translation axis.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Axis {
    /// X axis.
    X,
    /// Y axis.
    Y,
    /// Z axis.
    Z,
}

impl Axis {
    /// Component index (0, 1, 2).
    pub const fn index(self) -> usize {
        match self {
            Self::X => 0,
            Self::Y => 1,
            Self::Z => 2,
        }
    }
}

impl FromStr for Axis {
    type Err = ParseAxisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "x" | "X" => Ok(Self::X),
            "y" | "Y" => Ok(Self::Y),
            "z" | "Z" => Ok(Self::Z),
            other => Err(ParseAxisError(other.to_owned())),
        }
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::X => "x",
            Self::Y => "y",
            Self::Z => "z",
        })
    }
}

/// Subset of translate channels driven by a constraint.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct AxisMask {
    x: bool,
    y: bool,
    z: bool,
}

impl Default for AxisMask {
    fn default() -> Self {
        Self::ALL
    }
}

impl AxisMask {
    /// All three channels.
    pub const ALL: Self = Self {
        x: true,
        y: true,
        z: true,
    };

    /// No channels.
    pub const NONE: Self = Self {
        x: false,
        y: false,
        z: false,
    };

    /// Mask with every axis except the skipped ones. Repeats are harmless.
    pub fn from_skips(skips: &[Axis]) -> Self {
        let mut mask = Self::ALL;
        for axis in skips {
            match axis {
                Axis::X => mask.x = false,
                Axis::Y => mask.y = false,
                Axis::Z => mask.z = false,
            }
        }
        mask
    }

    /// `true` when `axis` is driven.
    pub const fn contains(self, axis: Axis) -> bool {
        match axis {
            Axis::X => self.x,
            Axis::Y => self.y,
            Axis::Z => self.z,
        }
    }

    /// `true` when all three channels are driven (the compound connection).
    pub const fn is_all(self) -> bool {
        self.x && self.y && self.z
    }

    /// `true` when no channel is driven.
    pub const fn is_empty(self) -> bool {
        !(self.x || self.y || self.z)
    }

    /// Driven axes in X, Y, Z order.
    pub fn axes(self) -> impl Iterator<Item = Axis> {
        [Axis::X, Axis::Y, Axis::Z]
            .into_iter()
            .filter(move |a| self.contains(*a))
    }

    /// Output plugs to connect: the compound plug when every channel is
    /// driven, otherwise one child plug per driven axis.
    pub fn output_plugs(self) -> Vec<Plug> {
        if self.is_all() {
            return vec![Plug::ConstraintTranslate];
        }
        self.axes()
            .map(|a| match a {
                Axis::X => Plug::ConstraintTranslateX,
                Axis::Y => Plug::ConstraintTranslateY,
                Axis::Z => Plug::ConstraintTranslateZ,
            })
            .collect()
    }
}

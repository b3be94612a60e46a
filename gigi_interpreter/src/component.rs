use std::fmt;

use gigi_core::{ComponentType, ConditionComparison, SetVariableOperator};

use crate::error::{EvaluationError, ParseError};

/// A scalar that variables are made of.
pub trait Component: Copy + Default + PartialEq + PartialOrd + fmt::Debug + 'static {
    const COMPONENT_TYPE: ComponentType;

    fn parse_component(text: &str) -> Option<Self>;
    fn format_component(&self) -> String;

    fn from_u32(value: u32) -> Self;
    fn to_u32(self) -> u32;
    fn is_zero(&self) -> bool;

    /// `None` when the operator is not defined for this type.
    fn apply(a: Self, b: Self, op: SetVariableOperator) -> Option<Self>;

    fn values(values: &ComponentValues) -> Option<&[Self]>;
    fn values_mut(values: &mut ComponentValues) -> Option<&mut [Self]>;
    fn wrap(values: Vec<Self>) -> ComponentValues;
}

macro_rules! impl_integer_component {
    ($ty:ty, $variant:ident) => {
        impl Component for $ty {
            const COMPONENT_TYPE: ComponentType = ComponentType::$variant;

            fn parse_component(text: &str) -> Option<Self> {
                text.parse().ok()
            }

            fn format_component(&self) -> String {
                self.to_string()
            }

            fn from_u32(value: u32) -> Self {
                <$ty>::try_from(value).unwrap_or(<$ty>::MAX)
            }

            fn to_u32(self) -> u32 {
                u32::try_from(self).unwrap_or(0)
            }

            fn is_zero(&self) -> bool {
                *self == 0
            }

            fn apply(a: Self, b: Self, op: SetVariableOperator) -> Option<Self> {
                let value = match op {
                    SetVariableOperator::Add => a.wrapping_add(b),
                    SetVariableOperator::Subtract => a.wrapping_sub(b),
                    SetVariableOperator::Multiply => a.wrapping_mul(b),
                    SetVariableOperator::Divide => {
                        if b == 0 {
                            0
                        } else {
                            a.wrapping_div(b)
                        }
                    }
                    SetVariableOperator::Modulo => {
                        if b == 0 {
                            0
                        } else {
                            a.wrapping_rem(b)
                        }
                    }
                    SetVariableOperator::PowerOf2GE => u32::try_from(a)
                        .ok()
                        .filter(|a| *a > 0)
                        .and_then(u32::checked_next_power_of_two)
                        .and_then(|power| <$ty>::try_from(power).ok())
                        .unwrap_or(0),
                    SetVariableOperator::BitwiseOr => a | b,
                    SetVariableOperator::BitwiseAnd => a & b,
                    SetVariableOperator::BitwiseXor => a ^ b,
                    SetVariableOperator::BitwiseNot => !a,
                    SetVariableOperator::Noop => a,
                };
                Some(value)
            }

            fn values(values: &ComponentValues) -> Option<&[Self]> {
                match values {
                    ComponentValues::$variant(values) => Some(values),
                    _ => None,
                }
            }

            fn values_mut(values: &mut ComponentValues) -> Option<&mut [Self]> {
                match values {
                    ComponentValues::$variant(values) => Some(values),
                    _ => None,
                }
            }

            fn wrap(values: Vec<Self>) -> ComponentValues {
                ComponentValues::$variant(values)
            }
        }
    };
}

impl_integer_component!(i32, Int);
impl_integer_component!(u16, Uint16);
impl_integer_component!(u32, Uint);

impl Component for f32 {
    const COMPONENT_TYPE: ComponentType = ComponentType::Float;

    fn parse_component(text: &str) -> Option<Self> {
        text.parse().ok()
    }

    fn format_component(&self) -> String {
        self.to_string()
    }

    fn from_u32(value: u32) -> Self {
        value as f32
    }

    fn to_u32(self) -> u32 {
        self as u32
    }

    fn is_zero(&self) -> bool {
        *self == 0.0
    }

    fn apply(a: Self, b: Self, op: SetVariableOperator) -> Option<Self> {
        match op {
            SetVariableOperator::Add => Some(a + b),
            SetVariableOperator::Subtract => Some(a - b),
            SetVariableOperator::Multiply => Some(a * b),
            SetVariableOperator::Divide => Some(a / b),
            SetVariableOperator::Modulo => Some(a % b),
            SetVariableOperator::PowerOf2GE => Some(2f32.powf(a.log2().ceil())),
            SetVariableOperator::Noop => Some(a),
            SetVariableOperator::BitwiseOr
            | SetVariableOperator::BitwiseAnd
            | SetVariableOperator::BitwiseXor
            | SetVariableOperator::BitwiseNot => None,
        }
    }

    fn values(values: &ComponentValues) -> Option<&[Self]> {
        match values {
            ComponentValues::Float(values) => Some(values),
            _ => None,
        }
    }

    fn values_mut(values: &mut ComponentValues) -> Option<&mut [Self]> {
        match values {
            ComponentValues::Float(values) => Some(values),
            _ => None,
        }
    }

    fn wrap(values: Vec<Self>) -> ComponentValues {
        ComponentValues::Float(values)
    }
}

impl Component for bool {
    const COMPONENT_TYPE: ComponentType = ComponentType::Bool;

    fn parse_component(text: &str) -> Option<Self> {
        if text.eq_ignore_ascii_case("true") || text == "1" {
            Some(true)
        } else if text.eq_ignore_ascii_case("false") || text == "0" {
            Some(false)
        } else {
            None
        }
    }

    fn format_component(&self) -> String {
        self.to_string()
    }

    fn from_u32(value: u32) -> Self {
        value != 0
    }

    fn to_u32(self) -> u32 {
        self as u32
    }

    fn is_zero(&self) -> bool {
        !*self
    }

    fn apply(a: Self, b: Self, op: SetVariableOperator) -> Option<Self> {
        match op {
            SetVariableOperator::BitwiseOr => Some(a || b),
            SetVariableOperator::BitwiseAnd => Some(a && b),
            SetVariableOperator::BitwiseXor => Some(a != b),
            SetVariableOperator::BitwiseNot => Some(!a),
            SetVariableOperator::Noop => Some(a),
            _ => None,
        }
    }

    fn values(values: &ComponentValues) -> Option<&[Self]> {
        match values {
            ComponentValues::Bool(values) => Some(values),
            _ => None,
        }
    }

    fn values_mut(values: &mut ComponentValues) -> Option<&mut [Self]> {
        match values {
            ComponentValues::Bool(values) => Some(values),
            _ => None,
        }
    }

    fn wrap(values: Vec<Self>) -> ComponentValues {
        ComponentValues::Bool(values)
    }
}

pub fn do_op<T: Component>(a: T, b: T, op: SetVariableOperator) -> Result<T, EvaluationError> {
    T::apply(a, b, op).ok_or(EvaluationError::UnsupportedOperator {
        op,
        component_type: T::COMPONENT_TYPE,
    })
}

pub fn compare<T: Component>(a: T, b: T, comparison: ConditionComparison) -> bool {
    match comparison {
        ConditionComparison::IsTrue => !a.is_zero(),
        ConditionComparison::IsFalse => a.is_zero(),
        ConditionComparison::Equals => a == b,
        ConditionComparison::NotEquals => a != b,
        ConditionComparison::Lt => a < b,
        ConditionComparison::Lte => a <= b,
        ConditionComparison::Gt => a > b,
        ConditionComparison::Gte => a >= b,
    }
}

/// Parses `count` comma separated components. Empty text yields zeros.
pub fn parse_components<T: Component>(text: &str, count: usize) -> Result<Vec<T>, ParseError> {
    let error = |reason: String| ParseError {
        text: text.to_string(),
        component_type: T::COMPONENT_TYPE,
        count,
        reason,
    };

    if text.trim().is_empty() {
        return Ok(vec![T::default(); count]);
    }

    let values = text
        .split(',')
        .map(|component| {
            let component = component.trim();
            T::parse_component(component)
                .ok_or_else(|| error(format!("\"{}\" is not a {}", component, T::COMPONENT_TYPE)))
        })
        .collect::<Result<Vec<T>, ParseError>>()?;

    if values.len() != count {
        return Err(error(format!("found {} component(s)", values.len())));
    }

    Ok(values)
}

pub fn format_components<T: Component>(values: &[T]) -> String {
    values
        .iter()
        .map(Component::format_component)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Component values of one of the scalar types.
#[derive(Clone, Debug, PartialEq)]
pub enum ComponentValues {
    Bool(Vec<bool>),
    Int(Vec<i32>),
    Uint16(Vec<u16>),
    Uint(Vec<u32>),
    Float(Vec<f32>),
}

macro_rules! for_each_values {
    ($values:expr, $v:ident => $body:expr) => {
        match $values {
            ComponentValues::Bool($v) => $body,
            ComponentValues::Int($v) => $body,
            ComponentValues::Uint16($v) => $body,
            ComponentValues::Uint($v) => $body,
            ComponentValues::Float($v) => $body,
        }
    };
}

impl ComponentValues {
    pub fn zeros(component_type: ComponentType, count: usize) -> Self {
        match component_type {
            ComponentType::Bool => Self::Bool(vec![false; count]),
            ComponentType::Int => Self::Int(vec![0; count]),
            ComponentType::Uint16 => Self::Uint16(vec![0; count]),
            ComponentType::Uint => Self::Uint(vec![0; count]),
            ComponentType::Float => Self::Float(vec![0.0; count]),
        }
    }

    pub fn parse(component_type: ComponentType, text: &str, count: usize) -> Result<Self, ParseError> {
        Ok(match component_type {
            ComponentType::Bool => Self::Bool(parse_components(text, count)?),
            ComponentType::Int => Self::Int(parse_components(text, count)?),
            ComponentType::Uint16 => Self::Uint16(parse_components(text, count)?),
            ComponentType::Uint => Self::Uint(parse_components(text, count)?),
            ComponentType::Float => Self::Float(parse_components(text, count)?),
        })
    }

    /// Converts sizes and counts into the given component type.
    pub fn from_u32s(component_type: ComponentType, values: &[u32]) -> Self {
        fn convert<T: Component>(values: &[u32]) -> ComponentValues {
            T::wrap(values.iter().map(|value| T::from_u32(*value)).collect())
        }

        match component_type {
            ComponentType::Bool => convert::<bool>(values),
            ComponentType::Int => convert::<i32>(values),
            ComponentType::Uint16 => convert::<u16>(values),
            ComponentType::Uint => convert::<u32>(values),
            ComponentType::Float => convert::<f32>(values),
        }
    }

    pub fn component_type(&self) -> ComponentType {
        match self {
            Self::Bool(_) => ComponentType::Bool,
            Self::Int(_) => ComponentType::Int,
            Self::Uint16(_) => ComponentType::Uint16,
            Self::Uint(_) => ComponentType::Uint,
            Self::Float(_) => ComponentType::Float,
        }
    }

    pub fn len(&self) -> usize {
        for_each_values!(self, values => values.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// `count` components starting at `start`.
    pub fn range(&self, start: usize, count: usize) -> Result<Self, EvaluationError> {
        let len = self.len();
        if start + count > len {
            return Err(EvaluationError::ComponentOutOfRange {
                index: start + count - 1,
                count: len,
            });
        }
        Ok(for_each_values!(self, values => Component::wrap(values[start..start + count].to_vec())))
    }

    /// Overwrites components starting at `start` with `source`.
    pub fn write(&mut self, start: usize, source: &ComponentValues) -> Result<(), EvaluationError> {
        let (len, source_len) = (self.len(), source.len());
        if start + source_len > len {
            return Err(EvaluationError::ComponentOutOfRange {
                index: start + source_len - 1,
                count: len,
            });
        }

        fn write_into<T: Component>(
            values: &mut [T],
            start: usize,
            source: &ComponentValues,
        ) -> Result<(), EvaluationError> {
            let components = T::values(source).ok_or(EvaluationError::TypeMismatch {
                expected: T::COMPONENT_TYPE,
                found: source.component_type(),
            })?;
            values[start..start + components.len()].copy_from_slice(components);
            Ok(())
        }

        for_each_values!(self, values => write_into(values, start, source))
    }

    pub fn format(&self) -> String {
        for_each_values!(self, values => format_components(values))
    }

    pub fn to_u32s(&self) -> Vec<u32> {
        for_each_values!(self, values => values.iter().map(|value| value.to_u32()).collect())
    }
}

/// Applies `op` component-wise. `b` must have at least as many components as `a`.
pub fn apply_op(
    a: &ComponentValues,
    b: &ComponentValues,
    op: SetVariableOperator,
) -> Result<ComponentValues, EvaluationError> {
    fn zip_op<T: Component>(
        a: &[T],
        b: &[T],
        op: SetVariableOperator,
    ) -> Result<ComponentValues, EvaluationError> {
        if b.len() < a.len() {
            return Err(EvaluationError::ComponentOutOfRange {
                index: a.len() - 1,
                count: b.len(),
            });
        }
        let values = a
            .iter()
            .zip(b)
            .map(|(a, b)| do_op(*a, *b, op))
            .collect::<Result<Vec<T>, _>>()?;
        Ok(T::wrap(values))
    }

    match (a, b) {
        (ComponentValues::Bool(a), ComponentValues::Bool(b)) => zip_op(a, b, op),
        (ComponentValues::Int(a), ComponentValues::Int(b)) => zip_op(a, b, op),
        (ComponentValues::Uint16(a), ComponentValues::Uint16(b)) => zip_op(a, b, op),
        (ComponentValues::Uint(a), ComponentValues::Uint(b)) => zip_op(a, b, op),
        (ComponentValues::Float(a), ComponentValues::Float(b)) => zip_op(a, b, op),
        _ => Err(EvaluationError::TypeMismatch {
            expected: a.component_type(),
            found: b.component_type(),
        }),
    }
}

/// True when the comparison holds for every component of `a`.
pub fn compare_values(
    a: &ComponentValues,
    b: &ComponentValues,
    comparison: ConditionComparison,
) -> Result<bool, EvaluationError> {
    fn all<T: Component>(a: &[T], b: &[T], comparison: ConditionComparison) -> bool {
        match comparison {
            // Unary comparisons ignore B
            ConditionComparison::IsTrue | ConditionComparison::IsFalse => {
                a.iter().all(|a| compare(*a, *a, comparison))
            }
            _ => a.iter().zip(b).all(|(a, b)| compare(*a, *b, comparison)),
        }
    }

    let unary = matches!(
        comparison,
        ConditionComparison::IsTrue | ConditionComparison::IsFalse
    );
    if !unary && b.len() < a.len() {
        return Err(EvaluationError::ComponentOutOfRange {
            index: a.len() - 1,
            count: b.len(),
        });
    }

    match (a, b) {
        (ComponentValues::Bool(a), ComponentValues::Bool(b)) => Ok(all(a, b, comparison)),
        (ComponentValues::Int(a), ComponentValues::Int(b)) => Ok(all(a, b, comparison)),
        (ComponentValues::Uint16(a), ComponentValues::Uint16(b)) => Ok(all(a, b, comparison)),
        (ComponentValues::Uint(a), ComponentValues::Uint(b)) => Ok(all(a, b, comparison)),
        (ComponentValues::Float(a), ComponentValues::Float(b)) => Ok(all(a, b, comparison)),
        _ => Err(EvaluationError::TypeMismatch {
            expected: a.component_type(),
            found: b.component_type(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(1, 1)]
    #[case(5, 8)]
    #[case(8, 8)]
    #[case(9, 16)]
    #[case(0, 0)]
    #[case(-3, 0)]
    #[case(i32::MAX, 0)]
    fn test_power_of_two_ge_int(#[case] a: i32, #[case] expected: i32) {
        assert_eq!(do_op(a, 0, SetVariableOperator::PowerOf2GE), Ok(expected));
    }

    #[rstest]
    #[case(1, 1)]
    #[case(5, 8)]
    #[case(8, 8)]
    #[case(9, 16)]
    #[case(0x8000_0001, 0)]
    fn test_power_of_two_ge_uint(#[case] a: u32, #[case] expected: u32) {
        assert_eq!(do_op(a, 0, SetVariableOperator::PowerOf2GE), Ok(expected));
    }

    #[test]
    fn test_power_of_two_ge_float() {
        assert_eq!(do_op(5.0f32, 0.0, SetVariableOperator::PowerOf2GE), Ok(8.0));
        assert_eq!(do_op(0.3f32, 0.0, SetVariableOperator::PowerOf2GE), Ok(0.5));
    }

    #[test]
    fn test_division_by_zero() {
        assert_eq!(do_op(7i32, 0, SetVariableOperator::Divide), Ok(0));
        assert_eq!(do_op(7u32, 0, SetVariableOperator::Modulo), Ok(0));
        assert_eq!(do_op(7u16, 0, SetVariableOperator::Divide), Ok(0));
        assert_eq!(do_op(i32::MIN, -1, SetVariableOperator::Divide), Ok(i32::MIN));

        let inf = do_op(1.0f32, 0.0, SetVariableOperator::Divide).unwrap();
        assert!(inf.is_infinite() && inf.is_sign_positive());
        assert!(do_op(0.0f32, 0.0, SetVariableOperator::Divide).unwrap().is_nan());
    }

    #[test]
    fn test_float_modulo_is_remainder() {
        assert_eq!(do_op(7.5f32, 2.0, SetVariableOperator::Modulo), Ok(1.5));
        assert_eq!(do_op(-7.5f32, 2.0, SetVariableOperator::Modulo), Ok(-1.5));
    }

    #[test]
    fn test_bool_ops() {
        assert_eq!(do_op(true, false, SetVariableOperator::BitwiseOr), Ok(true));
        assert_eq!(do_op(true, false, SetVariableOperator::BitwiseAnd), Ok(false));
        assert_eq!(do_op(true, true, SetVariableOperator::BitwiseXor), Ok(false));
        assert_eq!(do_op(true, true, SetVariableOperator::BitwiseNot), Ok(false));
        assert!(matches!(
            do_op(true, true, SetVariableOperator::Add),
            Err(EvaluationError::UnsupportedOperator {
                component_type: ComponentType::Bool,
                ..
            })
        ));
    }

    #[test]
    fn test_float_rejects_bitwise() {
        assert!(do_op(1.0f32, 2.0, SetVariableOperator::BitwiseXor).is_err());
    }

    #[test]
    fn test_integer_wraps() {
        assert_eq!(do_op(u32::MAX, 1, SetVariableOperator::Add), Ok(0));
        assert_eq!(do_op(0u16, 1, SetVariableOperator::Subtract), Ok(u16::MAX));
        assert_eq!(do_op(0x0Fu32, 0xF0, SetVariableOperator::BitwiseOr), Ok(0xFF));
    }

    #[rstest]
    #[case(ConditionComparison::IsTrue, 3, 0, true)]
    #[case(ConditionComparison::IsFalse, 3, 0, false)]
    #[case(ConditionComparison::Equals, 3, 3, true)]
    #[case(ConditionComparison::NotEquals, 3, 3, false)]
    #[case(ConditionComparison::Lt, 2, 3, true)]
    #[case(ConditionComparison::Lte, 3, 3, true)]
    #[case(ConditionComparison::Gt, 2, 3, false)]
    #[case(ConditionComparison::Gte, 3, 3, true)]
    fn test_compare(
        #[case] comparison: ConditionComparison,
        #[case] a: i32,
        #[case] b: i32,
        #[case] expected: bool,
    ) {
        assert_eq!(compare(a, b, comparison), expected);
    }

    #[test]
    fn test_compare_values_needs_every_component() {
        let a = ComponentValues::Float(vec![1.0, 2.0]);
        let b = ComponentValues::Float(vec![1.0, 3.0]);
        assert!(!compare_values(&a, &b, ConditionComparison::Equals).unwrap());
        assert!(compare_values(&a, &b, ConditionComparison::Lte).unwrap());

        let zero = ComponentValues::Uint(vec![1, 0]);
        assert!(!compare_values(&zero, &zero, ConditionComparison::IsTrue).unwrap());

        let int = ComponentValues::Int(vec![1]);
        assert!(matches!(
            compare_values(&a, &int, ConditionComparison::Equals),
            Err(EvaluationError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_compare_values_short_b() {
        let a = ComponentValues::Float(vec![1.0, 5.0]);
        let b = ComponentValues::Float(vec![1.0]);
        assert!(matches!(
            compare_values(&a, &b, ConditionComparison::Equals),
            Err(EvaluationError::ComponentOutOfRange { index: 1, count: 1 })
        ));
        assert!(compare_values(&a, &b, ConditionComparison::IsTrue).unwrap());
    }

    #[rstest]
    #[case(ComponentType::Int, "-3, 7", 2, "-3, 7")]
    #[case(ComponentType::Uint, "  4 ,5,6 ", 3, "4, 5, 6")]
    #[case(ComponentType::Uint16, "65535", 1, "65535")]
    #[case(ComponentType::Float, "0.1, 1e10, -2.5", 3, "0.1, 10000000000, -2.5")]
    #[case(ComponentType::Bool, "TRUE, 0", 2, "true, false")]
    #[case(ComponentType::Float, "", 2, "0, 0")]
    #[case(ComponentType::Bool, "   ", 1, "false")]
    fn test_parse_and_format(
        #[case] component_type: ComponentType,
        #[case] text: &str,
        #[case] count: usize,
        #[case] formatted: &str,
    ) {
        let values = ComponentValues::parse(component_type, text, count).unwrap();
        assert_eq!(values.format(), formatted);
        assert_eq!(
            ComponentValues::parse(component_type, &values.format(), count).unwrap(),
            values
        );
    }

    #[rstest]
    #[case(ComponentType::Int, "1.5", 1)]
    #[case(ComponentType::Uint, "-1", 1)]
    #[case(ComponentType::Uint16, "70000", 1)]
    #[case(ComponentType::Float, "1, 2", 3)]
    #[case(ComponentType::Bool, "yes", 1)]
    #[case(ComponentType::Int, "1,,2", 3)]
    fn test_parse_errors(
        #[case] component_type: ComponentType,
        #[case] text: &str,
        #[case] count: usize,
    ) {
        let error = ComponentValues::parse(component_type, text, count).unwrap_err();
        assert_eq!(error.text, text);
        assert_eq!(error.component_type, component_type);
        assert_eq!(error.count, count);
    }

    #[test]
    fn test_float_round_trip_is_exact() {
        let values = ComponentValues::Float(vec![0.1, 1.0 / 3.0, f32::MAX, f32::MIN_POSITIVE, -0.0]);
        let parsed = ComponentValues::parse(ComponentType::Float, &values.format(), 5).unwrap();
        assert_eq!(parsed, values);
    }

    #[test]
    fn test_range_and_write() {
        let mut values = ComponentValues::Uint(vec![1, 2, 3]);
        assert_eq!(values.range(1, 2).unwrap(), ComponentValues::Uint(vec![2, 3]));
        assert!(values.range(2, 2).is_err());

        values.write(2, &ComponentValues::Uint(vec![9])).unwrap();
        assert_eq!(values, ComponentValues::Uint(vec![1, 2, 9]));
        assert!(values.write(0, &ComponentValues::Int(vec![9])).is_err());
        assert!(values.write(3, &ComponentValues::Uint(vec![9])).is_err());
    }

    #[test]
    fn test_from_u32s() {
        assert_eq!(
            ComponentValues::from_u32s(ComponentType::Float, &[64, 32, 1]),
            ComponentValues::Float(vec![64.0, 32.0, 1.0])
        );
        assert_eq!(
            ComponentValues::from_u32s(ComponentType::Uint16, &[70000]),
            ComponentValues::Uint16(vec![u16::MAX])
        );
        assert_eq!(ComponentValues::Int(vec![-4, 4]).to_u32s(), [0, 4]);
    }
}

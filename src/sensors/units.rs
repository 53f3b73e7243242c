use std::fmt;

// !!!!!!!!!!!!!!!!! Unit !!!!!!!!!!!!!!!!!!!!!!!
/// Energy units. Sensors report microjoules, exporters may display another unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unit {
    Joule,
    MilliJoule,
    MicroJoule,
}

impl Unit {
    pub fn to(measure: f64, source_unit: &Unit, dest_unit: &Unit) -> f64 {
        measure * Unit::get_mult(source_unit.rank(), dest_unit.rank())
    }

    /// Position of the unit, each rank being 1000 times smaller than the previous one.
    fn rank(&self) -> usize {
        match self {
            Unit::Joule => 0,
            Unit::MilliJoule => 1,
            Unit::MicroJoule => 2,
        }
    }

    fn get_mult(pos_source: usize, pos_dest: usize) -> f64 {
        let mut mult: f64 = 1.0;
        if pos_dest > pos_source {
            for _ in 0..(pos_dest - pos_source) {
                mult *= 1000.0;
            }
        } else if pos_dest < pos_source {
            for _ in 0..(pos_source - pos_dest) {
                mult /= 1000.0;
            }
        }
        mult
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Unit::Joule => write!(f, "J"),
            Unit::MilliJoule => write!(f, "mJ"),
            Unit::MicroJoule => write!(f, "uJ"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joule_equals_1000000microjoules() {
        assert_eq!(Unit::to(1.0, &Unit::Joule, &Unit::MicroJoule), 1000000.0);
    }

    #[test]
    fn microjoules_to_joules() {
        assert_eq!(Unit::to(800000.0, &Unit::MicroJoule, &Unit::Joule), 0.8);
    }

    #[test]
    fn same_unit_is_identity() {
        assert_eq!(Unit::to(3.5, &Unit::MilliJoule, &Unit::MilliJoule), 3.5);
    }
}

//  Copyright 2020 The raplmon authors.
//
//  Licensed under the Apache License, Version 2.0 (the "License");
//  you may not use this file except in compliance with the License.
//  You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
//  Unless required by applicable law or agreed to in writing, software
//  distributed under the License is distributed on an "AS IS" BASIS,
//  WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
//  See the License for the specific language governing permissions and
//  limitations under the License.

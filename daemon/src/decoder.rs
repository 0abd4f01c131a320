// This file is part of plversiond, an application exposing programmable logic version information from device-tree described hardware.
//
// Copyright 2025 REDS Institute, HEIG-VD.
//
// SPDX-License-Identifier: GPL-3.0-only
//
// plversiond is free software: you can redistribute it and/or modify it under the terms of the GNU General Public License version 3, as published by the Free Software Foundation.
//
// plversiond is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranties of MERCHANTABILITY, SATISFACTORY QUALITY, or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with this program.  If not, see http://www.gnu.org/licenses/.

//! Decoding of the PL version registers.
//!
//! The hardware stores its build timestamp as packed bytes that read like decimal digits when
//! printed in hexadecimal (`0x20200615` is the 15th of June 2020). Nothing here converts to
//! decimal or validates the digits: fields are split with shifts and masks and printed back as
//! fixed-width lowercase hex. Every function is total over `u32`.

use std::fmt;

/// Build date of the PL bitstream, read from offset `0x0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateCode {
    pub year: u16,
    pub month: u8,
    pub day: u8,
}

/// Build time of the PL bitstream, read from offset `0x4`. The low byte of the word is unused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeCode {
    pub hours: u8,
    pub minutes: u8,
    pub seconds: u8,
}

impl fmt::Display for DateCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Date code [YYYY MM DD] : {:04x} {:02x} {:02x}",
            self.year, self.month, self.day
        )
    }
}

impl fmt::Display for TimeCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Time code [HH MM SS] : {:02x} {:02x} {:02x}",
            self.hours, self.minutes, self.seconds
        )
    }
}

/// Split a date code word into `YYYY MM DD`.
pub fn decode_date_code(word: u32) -> DateCode {
    DateCode {
        year: ((word >> 16) & 0xFFFF) as u16,
        month: ((word >> 8) & 0xFF) as u8,
        day: (word & 0xFF) as u8,
    }
}

/// Split a time code word into `HH MM SS`.
pub fn decode_time_code(word: u32) -> TimeCode {
    TimeCode {
        hours: ((word >> 24) & 0xFF) as u8,
        minutes: ((word >> 16) & 0xFF) as u8,
        seconds: ((word >> 8) & 0xFF) as u8,
    }
}

pub fn decode_hash_code(word: u32) -> String {
    format!("{word:08x}\n")
}

pub fn decode_version_code(word: u32) -> String {
    format!("{word:08x}\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use googletest::prelude::*;
    use proptest::prelude::*;
    use rstest::*;

    #[gtest]
    #[rstest]
    #[case::build_date(0x2020_0615, "Date code [YYYY MM DD] : 2020 06 15\n")]
    #[case::zero(0x0000_0000, "Date code [YYYY MM DD] : 0000 00 00\n")]
    #[case::not_bcd(0xABCD_EF01, "Date code [YYYY MM DD] : abcd ef 01\n")]
    fn renders_date_code(#[case] word: u32, #[case] expected: &str) {
        assert_that!(decode_date_code(word).to_string(), eq(expected));
    }

    #[gtest]
    #[rstest]
    #[case::build_time(0x1430_2500, "Time code [HH MM SS] : 14 30 25\n")]
    #[case::low_byte_ignored(0x1430_25FF, "Time code [HH MM SS] : 14 30 25\n")]
    #[case::all_ones(0xFFFF_FFFF, "Time code [HH MM SS] : ff ff ff\n")]
    fn renders_time_code(#[case] word: u32, #[case] expected: &str) {
        assert_that!(decode_time_code(word).to_string(), eq(expected));
    }

    #[gtest]
    #[rstest]
    #[case::hash(0xDEAD_BEEF, "deadbeef\n")]
    #[case::leading_zeros(0x0001_0203, "00010203\n")]
    fn renders_opaque_codes(#[case] word: u32, #[case] expected: &str) {
        expect_that!(decode_hash_code(word), eq(expected));
        expect_that!(decode_version_code(word), eq(expected));
    }

    #[gtest]
    fn date_code_fields() {
        assert_that!(
            decode_date_code(0x2020_0615),
            eq(DateCode {
                year: 0x2020,
                month: 0x06,
                day: 0x15,
            })
        );
    }

    proptest! {
        #[test]
        fn date_code_is_a_pure_field_split(word in any::<u32>()) {
            let date = decode_date_code(word);
            prop_assert_eq!(u32::from(date.year), (word >> 16) & 0xFFFF);
            prop_assert_eq!(u32::from(date.month), (word >> 8) & 0xFF);
            prop_assert_eq!(u32::from(date.day), word & 0xFF);
            prop_assert_eq!(date.to_string(), decode_date_code(word).to_string());
        }

        #[test]
        fn time_code_is_a_pure_field_split(word in any::<u32>()) {
            let time = decode_time_code(word);
            prop_assert_eq!(u32::from(time.hours), (word >> 24) & 0xFF);
            prop_assert_eq!(u32::from(time.minutes), (word >> 16) & 0xFF);
            prop_assert_eq!(u32::from(time.seconds), (word >> 8) & 0xFF);
        }

        #[test]
        fn opaque_codes_round_trip_through_hex(word in any::<u32>()) {
            for text in [decode_hash_code(word), decode_version_code(word)] {
                prop_assert_eq!(text.len(), 9);
                prop_assert!(text.ends_with('\n'));
                prop_assert_eq!(u32::from_str_radix(text.trim_end(), 16).ok(), Some(word));
            }
        }
    }
}

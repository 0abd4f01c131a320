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

pub mod status_proxy;
